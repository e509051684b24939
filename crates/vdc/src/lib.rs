//! # Verifiable Digital Credentials
//!
//! Cryptographic identity and credential codecs for the EUDI PID service:
//! ES256 (P-256) key pairs exchanged as JWKs, JWT-encoded W3C Verifiable
//! Credentials, `did:web` documents, and CBOR mdoc decoding for the
//! alternate doctype format.

pub mod did;
pub mod keys;
pub mod mso_mdoc;
pub mod w3c_vc;

use serde::{Deserialize, Serialize};

pub use self::did::{DidDocument, did_web};
pub use self::keys::{Jwk, Jwks, KeyError, KeyPair, verifier_key_pair};

/// The PID credential configuration identifier.
pub const PID_CREDENTIAL_TYPE: &str = "eu.europa.ec.eudi.pid.1";

/// The closed set of credential formats the protocol endpoints dispatch
/// over. Unrecognized wire values map to `Unknown` so handlers can reject
/// them with a protocol error instead of a deserialization failure.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum CredentialFormat {
    /// A JWT-encoded W3C Verifiable Credential.
    #[default]
    #[serde(rename = "jwt_vc")]
    JwtVc,

    /// A CBOR-encoded ISO mdoc.
    #[serde(rename = "mso_mdoc")]
    MsoMdoc,

    /// Any format this service does not issue or verify.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JwtVc => write!(f, "jwt_vc"),
            Self::MsoMdoc => write!(f, "mso_mdoc"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
