//! # Provider Traits
//!
//! Per-entity CRUD contracts the protocol crates consume. Implementations
//! decide where the rows live; the contracts only fix the semantics the
//! state machines depend on: validity filtering (`expires_at > now AND
//! used = false`) and atomic single-use consumption.

use std::future::Future;

use anyhow::Result;
use serde_json::Value;

use crate::entity::{
    AuthorizationCode, Challenge, IssuanceSession, IssuedCredential, IssuerKey, SessionStatus,
    VerificationSession, VerificationStatus, VerifiedCredential,
};

/// Storage of presentation challenges.
pub trait ChallengeStore: Send + Sync {
    /// Persist a new challenge.
    fn create_challenge(&self, challenge: Challenge) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve a challenge by value, filtering out expired and used rows.
    fn get_valid_challenge(
        &self, value: &str,
    ) -> impl Future<Output = Result<Option<Challenge>>> + Send;

    /// Atomically consume a challenge. Returns true iff this call made the
    /// `used = false -> true` transition, so concurrent redemptions cannot
    /// both succeed.
    fn try_consume_challenge(&self, value: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Remove expired challenges.
    fn delete_expired_challenges(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Storage of authorization and pre-authorized codes.
pub trait AuthorizationCodeStore: Send + Sync {
    /// Persist a new code.
    fn create_code(&self, code: AuthorizationCode) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve a code by value, filtering out expired and used rows.
    fn get_valid_code(
        &self, code: &str,
    ) -> impl Future<Output = Result<Option<AuthorizationCode>>> + Send;

    /// Atomically redeem a code. Returns true iff this call made the
    /// `used = false -> true` transition.
    fn try_consume_code(&self, code: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Storage of issuance sessions.
pub trait IssuanceSessionStore: Send + Sync {
    /// Persist a new session.
    fn create_session(&self, session: IssuanceSession)
    -> impl Future<Output = Result<()>> + Send;

    /// Resolve a bearer token to its session. Only sessions in the
    /// `Authorized` or `CredentialIssued` states resolve.
    fn get_session_by_token(
        &self, access_token: &str,
    ) -> impl Future<Output = Result<Option<IssuanceSession>>> + Send;

    /// Update a session's status, optionally rotating its `c_nonce`.
    fn update_session(
        &self, id: &str, status: SessionStatus, c_nonce: Option<String>,
        c_nonce_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Append-only log of issued credentials.
pub trait IssuedCredentialStore: Send + Sync {
    /// Persist an issued-credential audit record.
    fn create_issued(&self, credential: IssuedCredential)
    -> impl Future<Output = Result<()>> + Send;
}

/// Storage of issuer signing keys.
pub trait IssuerKeyStore: Send + Sync {
    /// Persist a key. When no active key exists the inserted key becomes
    /// active; when one does, the existing active key is returned instead,
    /// making lazy provisioning idempotent under concurrent first use.
    fn create_key(&self, key: IssuerKey) -> impl Future<Output = Result<IssuerKey>> + Send;

    /// The most recently created active key, if any.
    fn get_active_key(&self) -> impl Future<Output = Result<Option<IssuerKey>>> + Send;

    /// Look up a key by its `kid`.
    fn get_key_by_key_id(
        &self, key_id: &str,
    ) -> impl Future<Output = Result<Option<IssuerKey>>> + Send;

    /// Look up a key by the DID it signs for.
    fn get_key_by_issuer_did(
        &self, did: &str,
    ) -> impl Future<Output = Result<Option<IssuerKey>>> + Send;
}

/// Storage of verification sessions.
pub trait VerificationSessionStore: Send + Sync {
    /// Persist a new session.
    fn create_verification(
        &self, session: VerificationSession,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve a session by id.
    fn get_verification(
        &self, id: &str,
    ) -> impl Future<Output = Result<Option<VerificationSession>>> + Send;

    /// Retrieve the session created for a challenge.
    fn get_verification_by_challenge(
        &self, challenge_id: &str,
    ) -> impl Future<Output = Result<Option<VerificationSession>>> + Send;

    /// Transition a session, attaching the result or error payload.
    fn update_verification(
        &self, id: &str, status: VerificationStatus, data: Option<Value>, error: Option<String>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Append-only log of verified credentials.
pub trait VerifiedCredentialStore: Send + Sync {
    /// Persist a verified-credential audit record.
    fn create_verified(
        &self, credential: VerifiedCredential,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Look up a verified credential by row id.
    fn get_verified_by_id(
        &self, id: &str,
    ) -> impl Future<Output = Result<Option<VerifiedCredential>>> + Send;

    /// All verified credentials recorded for a session.
    fn get_verified_by_session(
        &self, session_id: &str,
    ) -> impl Future<Output = Result<Vec<VerifiedCredential>>> + Send;
}

/// Verifier trust policy.
pub trait Policy: Send + Sync {
    /// Whether a presentation from an issuer with no registered key may be
    /// accepted without signature verification. Defaults to fail-closed;
    /// demo providers opt in.
    fn allow_unknown_issuer(&self) -> bool {
        false
    }
}
