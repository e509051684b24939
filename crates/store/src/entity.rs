//! # Entities
//!
//! The artifact records persisted by the store. Challenges and authorization
//! codes are single-use with absolute expiries; credential records are
//! append-only audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anti-replay nonce backing one presentation request.
///
/// A challenge that is past `expires_at` or has `used` set must never again
/// validate a presentation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Challenge {
    /// Row identifier.
    pub id: String,

    /// The challenge value sent to the wallet (and echoed back as the
    /// presentation nonce).
    pub value: String,

    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Set once the challenge has been consumed by a successful callback.
    pub used: bool,
}

/// Proof that a holder is authorized to request a credential.
///
/// Redeemed exactly once at the token endpoint. Holder-supplied claims data
/// and the transaction code ride on the same row so they expire with the
/// code itself.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AuthorizationCode {
    /// Row identifier.
    pub id: String,

    /// The authorization (or pre-authorized) code value.
    pub code: String,

    /// OAuth client the code was issued to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Scope the code authorizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// PKCE code challenge from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Redirect URI the code must be redeemed against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Transaction code (PIN) bound to a pre-authorized code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<String>,

    /// Holder-supplied claims data carried through to the issuance session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,

    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,

    /// Set on redemption; a used code must never be redeemed again.
    pub used: bool,
}

/// Lifecycle of an issuance session.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session created, token not yet confirmed.
    #[default]
    Pending,

    /// Access token issued; the credential endpoint will accept it.
    Authorized,

    /// At least one credential has been issued on this session.
    CredentialIssued,

    /// Session expired before completion.
    Expired,

    /// Session failed terminally.
    Failed,
}

/// Binds an access token to holder-supplied claims data for the credential
/// endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IssuanceSession {
    /// Row identifier.
    pub id: String,

    /// The authorization code this session was created from.
    pub auth_code_id: String,

    /// Bearer token accepted by the credential endpoint.
    pub access_token: String,

    /// Nonce the wallet must include in its next proof of possession.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    /// Expiry of the current `c_nonce`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_at: Option<DateTime<Utc>>,

    /// Current lifecycle status.
    pub status: SessionStatus,

    /// Holder-supplied claims data for credential construction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Record of a minted verifiable credential. Append-only; `revoked` is the
/// only mutable flag and is not exercised by the current flows.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IssuedCredential {
    /// Row identifier.
    pub id: String,

    /// The issuance session the credential was minted on.
    pub session_id: String,

    /// Public credential identifier.
    pub credential_id: String,

    /// Credential format (`jwt_vc`).
    pub format: String,

    /// Credential type (`eu.europa.ec.eudi.pid.1`).
    pub credential_type: String,

    /// The encoded (signed) credential.
    pub credential: String,

    /// Snapshot of the claims the credential asserts.
    pub claims: Value,

    /// `kid` of the issuer key that signed the credential.
    pub issuer_key_id: String,

    /// Subject identifier embedded in the credential.
    pub subject_id: String,

    /// Issuance time.
    pub issued_at: DateTime<Utc>,

    /// Credential expiry.
    pub expires_at: DateTime<Utc>,

    /// Terminal revocation flag.
    pub revoked: bool,
}

/// Signing key material for the issuer. Exactly one key is active at a
/// time; issuance always signs with the active key.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IssuerKey {
    /// Row identifier.
    pub id: String,

    /// The `kid` embedded in credential JWT headers.
    pub key_id: String,

    /// DID the key signs on behalf of.
    pub issuer_did: String,

    /// Key type (`EC`).
    pub key_type: String,

    /// Signing algorithm (`ES256`).
    pub algorithm: String,

    /// Public half, serialized JWK JSON.
    pub public_jwk: String,

    /// Private half, serialized JWK JSON.
    pub private_jwk: String,

    /// Whether this key is the active signing key.
    pub is_active: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a verification session. Transitions from `Pending` to a
/// terminal state exactly once.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Awaiting a wallet response.
    #[default]
    Pending,

    /// Presentation verified.
    Verified,

    /// Presentation rejected.
    Failed,

    /// Session expired before a response arrived.
    Expired,
}

/// Tracks one presentation-verification attempt.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VerificationSession {
    /// Row identifier.
    pub id: String,

    /// The challenge backing this session.
    pub challenge_id: String,

    /// Current lifecycle status.
    pub status: VerificationStatus,

    /// Result payload attached on the terminal transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_data: Option<Value>,

    /// Failure description, when the session failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the session reached `Verified`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Persisted outcome of a successful presentation. Immutable after
/// creation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VerifiedCredential {
    /// Row identifier.
    pub id: String,

    /// The verification session that produced this record.
    pub session_id: String,

    /// Verified credential type.
    pub credential_type: String,

    /// Credential issuer (DID).
    pub issuer: String,

    /// Credential subject, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// The verified claims.
    pub claims: Value,

    /// Verification time.
    pub verified_at: DateTime<Utc>,
}
