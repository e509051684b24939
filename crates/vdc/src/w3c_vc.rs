//! # W3C Verifiable Credentials (JWT encoding)
//!
//! Builds and verifies the VC-JWT representation of the PID credential:
//! holder claims are mapped into a camel-cased `credentialSubject`, wrapped
//! in the `vc` envelope, and signed ES256 with the issuer's active key.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::keys::{self, Jwk, KeyError, KeyPair};

/// Credential lifetime.
const ONE_YEAR_SECS: i64 = 365 * 24 * 60 * 60;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The token is not a three-segment JWT.
    #[error("invalid JWT format")]
    Format,

    /// A JWT segment could not be decoded.
    #[error("issue decoding JWT: {0}")]
    Decode(String),

    /// The credential could not be signed.
    #[error("issue signing credential: {0}")]
    Signing(String),

    /// Key material was unusable.
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Holder-supplied identity claims, as accepted by the authorize endpoint.
/// Deserialization tolerates missing mandatory fields (they arrive as empty
/// strings) so the endpoint can report `missing_user_data` instead of a
/// deserialization failure.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PidClaims {
    /// Given name. Mandatory.
    pub given_name: String,

    /// Family name. Mandatory.
    pub family_name: String,

    /// Date of birth (`YYYY-MM-DD`). Mandatory.
    pub birth_date: String,

    /// Whether the holder is over 18.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_over_18: Option<bool>,

    /// Whether the holder is over 21.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_over_21: Option<bool>,

    /// Identity document number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,

    /// Document expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    /// Document issue date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,

    /// Issuing country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_country: Option<String>,

    /// Issuing authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
}

/// The camel-cased subject of an issued PID credential. Age flags are
/// stringified booleans, per the published schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    /// Subject identifier (holder DID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Given name.
    pub given_name: String,

    /// Family name.
    pub family_name: String,

    /// Date of birth.
    pub birth_date: String,

    /// `"true"`/`"false"`.
    pub age_over_18: String,

    /// `"true"`/`"false"`.
    pub age_over_21: String,

    /// Document number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,

    /// Document expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    /// Document issue date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,

    /// Issuing country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_country: Option<String>,

    /// Issuing authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
}

impl From<&PidClaims> for CredentialSubject {
    fn from(claims: &PidClaims) -> Self {
        Self {
            id: None,
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            birth_date: claims.birth_date.clone(),
            age_over_18: claims.age_over_18.unwrap_or_default().to_string(),
            age_over_21: claims.age_over_21.unwrap_or_default().to_string(),
            document_number: claims.document_number.clone(),
            expiry_date: claims.expiry_date.clone(),
            issue_date: claims.issue_date.clone(),
            issuing_country: claims.issuing_country.clone(),
            issuing_authority: claims.issuing_authority.clone(),
        }
    }
}

impl From<&CredentialSubject> for PidClaims {
    fn from(subject: &CredentialSubject) -> Self {
        Self {
            given_name: subject.given_name.clone(),
            family_name: subject.family_name.clone(),
            birth_date: subject.birth_date.clone(),
            age_over_18: Some(subject.age_over_18 == "true"),
            age_over_21: Some(subject.age_over_21 == "true"),
            document_number: subject.document_number.clone(),
            expiry_date: subject.expiry_date.clone(),
            issue_date: subject.issue_date.clone(),
            issuing_country: subject.issuing_country.clone(),
            issuing_authority: subject.issuing_authority.clone(),
        }
    }
}

/// Reference to the published credential schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialSchema {
    /// Schema endpoint URL.
    pub id: String,

    /// Schema validator type.
    #[serde(rename = "type")]
    pub type_: String,
}

/// The `vc` envelope of a VC-JWT.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VcPayload {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// `["VerifiableCredential", <credential type>]`.
    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// Issuer DID.
    pub issuer: String,

    /// RFC 3339 issuance instant, derived from `iat`.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,

    /// RFC 3339 expiry instant, derived from `exp`.
    #[serde(rename = "expirationDate")]
    pub expiration_date: String,

    /// The credential's subject claims.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,

    /// Pointer to the published schema.
    #[serde(rename = "credentialSchema")]
    pub credential_schema: CredentialSchema,
}

/// Full VC-JWT claims: registered JWT claims plus the `vc` envelope.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VcClaims {
    /// Issuer DID.
    pub iss: String,

    /// Subject identifier.
    pub sub: String,

    /// Issued-at, seconds since epoch.
    pub iat: i64,

    /// Expiry, seconds since epoch.
    pub exp: i64,

    /// Fresh UUID URN per credential.
    pub jti: String,

    /// The credential itself.
    pub vc: VcPayload,
}

/// Builds a signed VC-JWT.
#[derive(Debug)]
pub struct VcBuilder<'a> {
    claims: &'a PidClaims,
    key_pair: &'a KeyPair,
    subject_id: String,
    credential_type: String,
    schema_uri: String,
}

impl<'a> VcBuilder<'a> {
    /// Start a builder for the given holder claims and signing key.
    #[must_use]
    pub fn new(claims: &'a PidClaims, key_pair: &'a KeyPair) -> Self {
        Self {
            claims,
            key_pair,
            subject_id: String::new(),
            credential_type: crate::PID_CREDENTIAL_TYPE.to_string(),
            schema_uri: String::new(),
        }
    }

    /// Set the subject (holder) identifier.
    #[must_use]
    pub fn subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = subject_id.into();
        self
    }

    /// Override the credential type.
    #[must_use]
    pub fn credential_type(mut self, credential_type: impl Into<String>) -> Self {
        self.credential_type = credential_type.into();
        self
    }

    /// Set the published schema endpoint.
    #[must_use]
    pub fn schema_uri(mut self, schema_uri: impl Into<String>) -> Self {
        self.schema_uri = schema_uri.into();
        self
    }

    /// Assemble and sign the credential.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` when the signing key is unusable or encoding
    /// fails.
    pub fn build(self) -> Result<String, CodecError> {
        let now = Utc::now().timestamp();
        let exp = now + ONE_YEAR_SECS;

        let mut subject = CredentialSubject::from(self.claims);
        subject.id = Some(self.subject_id.clone());

        let claims = VcClaims {
            iss: self.key_pair.issuer_did.clone(),
            sub: self.subject_id,
            iat: now,
            exp,
            jti: format!("urn:uuid:{}", Uuid::new_v4()),
            vc: VcPayload {
                context: vec![
                    "https://www.w3.org/2018/credentials/v1".to_string(),
                    "https://europa.eu/eudi/pid/v1".to_string(),
                ],
                type_: vec!["VerifiableCredential".to_string(), self.credential_type],
                issuer: self.key_pair.issuer_did.clone(),
                issuance_date: to_rfc3339(now),
                expiration_date: to_rfc3339(exp),
                credential_subject: subject,
                credential_schema: CredentialSchema {
                    id: self.schema_uri,
                    type_: "JsonSchemaValidator2018".to_string(),
                },
            },
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_pair.key_id.clone());

        let key = self.key_pair.encoding_key()?;
        jsonwebtoken::encode(&header, &claims, &key).map_err(|e| CodecError::Signing(e.to_string()))
    }
}

/// Outcome of verifying a VC-JWT. Failures during key import, signature
/// verification, or structural checks are captured here; nothing is raised
/// to the caller.
#[derive(Clone, Debug)]
pub struct Verification {
    /// Whether the credential verified.
    pub is_valid: bool,

    /// The decoded claims, when verification succeeded.
    pub payload: Option<VcClaims>,

    /// Failure description, when it did not.
    pub error: Option<String>,
}

impl Verification {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Verify a VC-JWT against the issuer's public JWK: signature first, then
/// structure, then expiry (with its own distinct error).
#[must_use]
pub fn verify(token: &str, issuer_public_jwk: &Jwk) -> Verification {
    let key = match keys::decoding_key(issuer_public_jwk) {
        Ok(key) => key,
        Err(e) => return Verification::failed(format!("JWT verification failed: {e}")),
    };

    let mut validation = Validation::new(Algorithm::ES256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let claims = match jsonwebtoken::decode::<Value>(token, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => return Verification::failed(format!("JWT verification failed: {e}")),
    };

    if claims.pointer("/vc/credentialSubject").is_none() {
        return Verification::failed("Invalid credential structure");
    }
    if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
        if exp < Utc::now().timestamp() {
            return Verification::failed("Credential has expired");
        }
    }

    match serde_json::from_value::<VcClaims>(claims) {
        Ok(payload) => Verification {
            is_valid: true,
            payload: Some(payload),
            error: None,
        },
        Err(e) => Verification::failed(format!("Invalid credential structure: {e}")),
    }
}

/// Split and base64url-decode a JWT without verifying its signature,
/// returning the raw payload. Used by the verifier's unknown-issuer
/// fallback and for extracting display data.
///
/// # Errors
///
/// Returns `CodecError::Format` unless the token has exactly three
/// dot-separated segments, and `CodecError::Decode` when a segment is not
/// valid base64url JSON.
pub fn decode_unverified(token: &str) -> Result<Value, CodecError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(CodecError::Format);
    }
    let payload = Base64UrlUnpadded::decode_vec(parts[1].trim_end_matches('='))
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    serde_json::from_slice(&payload).map_err(|e| CodecError::Decode(e.to_string()))
}

fn to_rfc3339(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
