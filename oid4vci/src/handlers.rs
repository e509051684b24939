//! # Endpoint
//!
//! Entry point for issuance requests. Requests are routed to the
//! appropriate handler for processing, returning a reply that can be
//! serialized to a JSON object.

mod authorize;
mod credential;
mod metadata;
mod token;

use std::fmt::Debug;

pub use eudi_core::{Body, Handler, Headers, NoHeaders, Request, Response};

pub use self::credential::get_or_create_active_key;
pub use self::metadata::IssuerMetadataRequest;
use crate::error::Error;
use crate::provider::Provider;
use crate::{Result, types};

/// Handle incoming issuance messages.
///
/// # Errors
///
/// Returns an `OpenID4VCI` error if the request is invalid or the provider
/// is unavailable. Expected protocol failures (expired codes, wrong
/// transaction codes) surface as their OAuth error variants.
pub async fn handle<B, H, P, U>(
    issuer: &str, request: impl Into<Request<B, H>> + Debug, provider: &P,
) -> Result<Response<U>>
where
    B: Body,
    H: Headers,
    P: Provider,
    Request<B, H>: Handler<U, P, Error = Error>,
{
    let request: Request<B, H> = request.into();
    request.handle(issuer, provider).await
}

/// Credential request headers.
pub type CredentialHeaders = AuthorizationHeader;

/// An authorization-only header for use by handlers that solely require
/// authorization.
#[derive(Clone, Debug)]
pub struct AuthorizationHeader {
    /// The authorization header (access token).
    pub authorization: String,
}

impl Headers for AuthorizationHeader {}

/// Convenience constructor for an authorized request.
#[must_use]
pub fn authorized(
    body: types::CredentialRequest, access_token: &str,
) -> Request<types::CredentialRequest, CredentialHeaders> {
    Request {
        body,
        headers: AuthorizationHeader {
            authorization: access_token.to_string(),
        },
    }
}
