//! # Endpoint
//!
//! Entry point for verification requests. Requests are routed to the
//! appropriate handler for processing, returning a reply that can be
//! serialized to a JSON object.

mod create_request;
mod metadata;
mod request_object;
mod response;
mod start;
mod status;

use std::fmt::Debug;

pub use eudi_core::{Body, Handler, Headers, NoHeaders, Request, Response};

use crate::error::Error;
use crate::provider::Provider;
use crate::Result;

/// Handle incoming verification messages.
///
/// # Errors
///
/// Returns an `OpenID4VP` error if the request is malformed or the provider
/// is unavailable. Rejected presentations are not errors: they surface as
/// `{verified: false}` responses with the failure persisted onto the
/// session.
pub async fn handle<B, H, P, U>(
    verifier: &str, request: impl Into<Request<B, H>> + Debug, provider: &P,
) -> Result<Response<U>>
where
    B: Body,
    H: Headers,
    P: Provider,
    Request<B, H>: Handler<U, P, Error = Error>,
{
    let request: Request<B, H> = request.into();
    request.handle(verifier, provider).await
}
