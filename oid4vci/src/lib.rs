//! An API for the issuance of Verifiable Credentials based on the
//! [OpenID for Verifiable Credential Issuance](https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html)
//! specification, profiled for the EU digital-identity PID credential.
//!
//! The crate drives the pre-authorized-code flow end to end (authorize,
//! token, credential), plus the standard authorization-code grant with
//! PKCE, against an externally provided artifact store.

pub mod pkce;
pub mod provider;
pub mod types;

mod error;
mod handlers;
mod state;

pub use self::error::Error;
pub use self::handlers::*;
pub use self::state::Expire;
pub use self::types::*;

/// Result type for `OpenID` for Verifiable Credential Issuance.
pub type Result<T, E = Error> = anyhow::Result<T, E>;
