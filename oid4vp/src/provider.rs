//! # Provider Traits
//!
//! The capabilities an implementer must supply for the verification
//! endpoints: the artifact-store contracts for challenges, sessions, and
//! verified credentials, the issuer-key lookup used to verify credential
//! signatures, and the trust policy.

pub use eudi_store::{
    ChallengeStore, IssuerKeyStore, Policy, VerificationSessionStore, VerifiedCredentialStore,
};

/// Verifier provider trait.
pub trait Provider:
    ChallengeStore
    + VerificationSessionStore
    + VerifiedCredentialStore
    + IssuerKeyStore
    + Policy
    + Clone
    + Send
    + Sync
    + 'static
{
}

/// A blanket implementation for `Provider` so that any type implementing
/// the required super traits is considered a `Provider`.
impl<T> Provider for T where
    T: ChallengeStore
        + VerificationSessionStore
        + VerifiedCredentialStore
        + IssuerKeyStore
        + Policy
        + Clone
        + Send
        + Sync
        + 'static
{
}
