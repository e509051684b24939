//! # Keys
//!
//! Generation and import of the ES256 (P-256) key pairs used to sign
//! credentials (issuer) and request objects (verifier). Key material is
//! exchanged as JWKs so a pair persisted to the store can be reimported
//! with full signing fidelity.

use std::sync::OnceLock;

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::EncodePrivateKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key-management errors. Signing with a malformed or mismatched JWK fails
/// here; there is no fallback.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A JWK could not be parsed or reconstructed into an operable key.
    #[error("key import failed: {0}")]
    Import(String),

    /// The public half does not match the private half.
    #[error("public key does not match private key")]
    Mismatch,

    /// Key material could not be bridged into the JWT library.
    #[error("signing key unusable: {0}")]
    Signing(String),
}

/// An elliptic-curve JSON Web Key (P-256).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type (`EC`).
    pub kty: String,

    /// Curve (`P-256`).
    pub crv: String,

    /// Base64url-encoded x coordinate.
    pub x: String,

    /// Base64url-encoded y coordinate.
    pub y: String,

    /// Base64url-encoded private scalar, present on private keys only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended use (`sig`).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub r#use: Option<String>,

    /// Algorithm (`ES256`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

/// A JWK set, as served by a JWKS endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Jwks {
    /// The set's keys (public halves only).
    pub keys: Vec<Jwk>,
}

/// An operable ES256 signing key pair tagged with its `kid` and the DID it
/// signs on behalf of.
#[derive(Clone, Debug)]
pub struct KeyPair {
    /// The `kid` placed in JWT headers and JWKs.
    pub key_id: String,

    /// Signing algorithm (`ES256`).
    pub algorithm: String,

    /// DID of the controlling party.
    pub issuer_did: String,

    /// Public half.
    pub public_jwk: Jwk,

    /// Private half.
    pub private_jwk: Jwk,
}

impl KeyPair {
    /// Generate a fresh P-256 key pair. Each call produces independent,
    /// cryptographically random key material.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the generated key cannot be encoded as a JWK.
    pub fn generate(key_id: &str, issuer_did: &str) -> Result<Self, KeyError> {
        let secret = SecretKey::random(&mut OsRng);
        Self::from_secret(&secret, key_id, issuer_did)
    }

    /// Reconstruct an operable key pair from persisted JWK strings. The
    /// result signs identically to the originally generated pair.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Import` when either JWK is malformed and
    /// `KeyError::Mismatch` when the public half does not belong to the
    /// private half.
    pub fn import(
        key_id: &str, public_jwk: &str, private_jwk: &str, issuer_did: &str,
    ) -> Result<Self, KeyError> {
        let public: Jwk =
            serde_json::from_str(public_jwk).map_err(|e| KeyError::Import(e.to_string()))?;
        let private: Jwk =
            serde_json::from_str(private_jwk).map_err(|e| KeyError::Import(e.to_string()))?;

        if public.kty != "EC" || public.crv != "P-256" {
            return Err(KeyError::Import(format!(
                "unsupported key type {}/{}",
                public.kty, public.crv
            )));
        }

        let secret = secret_from_jwk(&private)?;
        let rebuilt = Self::from_secret(&secret, key_id, issuer_did)?;
        if rebuilt.public_jwk.x != public.x || rebuilt.public_jwk.y != public.y {
            return Err(KeyError::Mismatch);
        }

        Ok(rebuilt)
    }

    fn from_secret(secret: &SecretKey, key_id: &str, issuer_did: &str) -> Result<Self, KeyError> {
        let point = secret.public_key().to_encoded_point(false);
        let x = point.x().ok_or_else(|| KeyError::Import("missing x coordinate".to_string()))?;
        let y = point.y().ok_or_else(|| KeyError::Import("missing y coordinate".to_string()))?;

        let public_jwk = Jwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: Base64UrlUnpadded::encode_string(x),
            y: Base64UrlUnpadded::encode_string(y),
            d: None,
            kid: Some(key_id.to_string()),
            r#use: Some("sig".to_string()),
            alg: Some("ES256".to_string()),
        };
        let private_jwk = Jwk {
            d: Some(Base64UrlUnpadded::encode_string(&secret.to_bytes())),
            ..public_jwk.clone()
        };

        Ok(Self {
            key_id: key_id.to_string(),
            algorithm: "ES256".to_string(),
            issuer_did: issuer_did.to_string(),
            public_jwk,
            private_jwk,
        })
    }

    /// The private half as a `jsonwebtoken` encoding key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` when the private JWK cannot be reconstructed.
    pub fn encoding_key(&self) -> Result<EncodingKey, KeyError> {
        let secret = secret_from_jwk(&self.private_jwk)?;
        let der = secret.to_pkcs8_der().map_err(|e| KeyError::Signing(e.to_string()))?;
        Ok(EncodingKey::from_ec_der(der.as_bytes()))
    }

    /// The public half as a `jsonwebtoken` decoding key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` when the coordinates are not valid base64url.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        decoding_key(&self.public_jwk)
    }
}

/// Build a `jsonwebtoken` decoding key from a public JWK.
///
/// # Errors
///
/// Returns `KeyError::Import` when the coordinates are rejected.
pub fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, KeyError> {
    DecodingKey::from_ec_components(&jwk.x, &jwk.y)
        .map_err(|e| KeyError::Import(e.to_string()))
}

fn secret_from_jwk(jwk: &Jwk) -> Result<SecretKey, KeyError> {
    let Some(d) = &jwk.d else {
        return Err(KeyError::Import("private JWK is missing 'd'".to_string()));
    };
    let d = Base64UrlUnpadded::decode_vec(d).map_err(|e| KeyError::Import(e.to_string()))?;
    SecretKey::from_slice(&d).map_err(|e| KeyError::Import(e.to_string()))
}

static VERIFIER_KEY: OnceLock<KeyPair> = OnceLock::new();

/// The process-wide verifier key pair, generated lazily on first use and
/// identical on every subsequent call. Two racing first-requests both
/// generate, but only one pair is stored and both observe the winner, so
/// the JWKS endpoint and request-object signatures can never disagree.
///
/// # Errors
///
/// Returns `KeyError` if first-use generation fails.
pub fn verifier_key_pair(verifier_did: &str) -> Result<&'static KeyPair, KeyError> {
    if let Some(pair) = VERIFIER_KEY.get() {
        return Ok(pair);
    }
    let pair = KeyPair::generate("verifier-key-1", verifier_did)?;
    Ok(VERIFIER_KEY.get_or_init(|| pair))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Export/import round-trip: the reimported pair must expose identical
    // key material in both directions.
    #[test]
    fn import_round_trip() {
        let pair = KeyPair::generate("issuer-key-1", "did:web:localhost").unwrap();
        let public = serde_json::to_string(&pair.public_jwk).unwrap();
        let private = serde_json::to_string(&pair.private_jwk).unwrap();

        let imported =
            KeyPair::import("issuer-key-1", &public, &private, "did:web:localhost").unwrap();
        assert_eq!(imported.public_jwk, pair.public_jwk);
        assert_eq!(imported.private_jwk, pair.private_jwk);
    }

    #[test]
    fn import_rejects_garbage() {
        let err = KeyPair::import("k", "{not json", "{}", "did:web:localhost").unwrap_err();
        assert!(matches!(err, KeyError::Import(_)));
    }

    // A public half belonging to a different private half is a mismatch,
    // not a silently wrong signer.
    #[test]
    fn import_rejects_mismatched_halves() {
        let a = KeyPair::generate("a", "did:web:localhost").unwrap();
        let b = KeyPair::generate("b", "did:web:localhost").unwrap();

        let public = serde_json::to_string(&a.public_jwk).unwrap();
        let private = serde_json::to_string(&b.private_jwk).unwrap();
        let err = KeyPair::import("a", &public, &private, "did:web:localhost").unwrap_err();
        assert!(matches!(err, KeyError::Mismatch));
    }

    #[test]
    fn fresh_keys_are_random() {
        let a = KeyPair::generate("k", "did:web:localhost").unwrap();
        let b = KeyPair::generate("k", "did:web:localhost").unwrap();
        assert_ne!(a.private_jwk.d, b.private_jwk.d);
    }

    #[test]
    fn verifier_key_is_memoized() {
        let first = verifier_key_pair("did:web:localhost:verifier").unwrap();
        let second = verifier_key_pair("did:web:localhost:verifier").unwrap();
        assert_eq!(first.public_jwk, second.public_jwk);
    }
}
