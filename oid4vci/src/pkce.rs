//! # PKCE
//!
//! Proof Key for Code Exchange ([RFC7636](https://www.rfc-editor.org/rfc/rfc7636))
//! S256 challenge computation for the authorization-code grant.

use base64ct::{Base64UrlUnpadded, Encoding};
use sha2::{Digest, Sha256};

/// Compute the S256 code challenge for a code verifier.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(verifier.as_bytes()))
}

/// Whether a code verifier matches the stored challenge.
#[must_use]
pub fn verify(verifier: &str, challenge: &str) -> bool {
    code_challenge(verifier) == challenge
}
