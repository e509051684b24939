//! # Provider Traits
//!
//! The capabilities an implementer must supply for the issuance endpoints:
//! the artifact-store contracts for codes, sessions, issued credentials,
//! and issuer keys.

pub use eudi_store::{
    AuthorizationCodeStore, IssuanceSessionStore, IssuedCredentialStore, IssuerKeyStore,
};

/// Issuer provider trait.
pub trait Provider:
    AuthorizationCodeStore + IssuanceSessionStore + IssuedCredentialStore + IssuerKeyStore + Clone
{
}

/// A blanket implementation for `Provider` so that any type implementing
/// the required super traits is considered a `Provider`.
impl<T> Provider for T where
    T: AuthorizationCodeStore
        + IssuanceSessionStore
        + IssuedCredentialStore
        + IssuerKeyStore
        + Clone
{
}
