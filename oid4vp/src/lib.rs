//! An API for the verification of Verifiable Presentations based on the
//! [OpenID for Verifiable Presentations](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html)
//! and [SIOPv2](https://openid.net/specs/openid-connect-self-issued-v2-1_0.html)
//! specifications, profiled for the EU digital-identity PID credential.
//!
//! The crate drives a presentation from challenge issuance through wallet
//! response validation to a persisted verification outcome: start issues a
//! challenge and query, the request-object endpoint serves the signed
//! SIOPv2 request, finish and callback validate the returned `vp_token`,
//! and status exposes the recorded result.

pub mod provider;
pub mod types;

mod error;
mod handlers;
mod state;

pub use self::error::Error;
pub use self::handlers::*;
pub use self::state::Expire;
pub use self::types::*;

/// Result type for `OpenID` for Verifiable Presentations.
pub type Result<T, E = Error> = anyhow::Result<T, E>;
