//! # Status and Lookup Endpoints
//!
//! Read-only views over verification state: a client polling loop fetches
//! a session's status, and verified-credential records can be retrieved by
//! session or by row id. No state is mutated here.

use anyhow::Context as _;

use crate::handlers::{Handler, Request, Response};
use crate::provider::{Provider, VerificationSessionStore, VerifiedCredentialStore};
use crate::types::{
    CredentialByIdRequest, CredentialByIdResponse, SessionCredentialsRequest,
    SessionCredentialsResponse, StatusRequest, StatusResponse,
};
use crate::{Error, Result};

/// Status-poll handler.
///
/// # Errors
///
/// Returns `not_found` when the session is unknown.
async fn status(
    _verifier: &str, provider: &impl Provider, request: StatusRequest,
) -> Result<StatusResponse> {
    let Some(session) =
        provider.get_verification(&request.session_id).await.context("fetching session")?
    else {
        return Err(Error::NotFound("Verification session not found".to_string()));
    };

    Ok(StatusResponse {
        session_id: session.id,
        status: session.status,
        credential_data: session.presentation_data,
        error: session.error,
        created_at: session.created_at,
        updated_at: session.updated_at,
    })
}

impl<P: Provider> Handler<StatusResponse, P> for Request<StatusRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, provider: &P) -> Result<Response<StatusResponse>> {
        Ok(status(verifier, provider, self.body).await?.into())
    }
}

/// Session-credentials lookup handler.
///
/// # Errors
///
/// Returns `not_found` when the session has no recorded credentials.
async fn session_credentials(
    _verifier: &str, provider: &impl Provider, request: SessionCredentialsRequest,
) -> Result<SessionCredentialsResponse> {
    let credentials = provider
        .get_verified_by_session(&request.session_id)
        .await
        .context("fetching verified credentials")?;
    if credentials.is_empty() {
        return Err(Error::NotFound(
            "No verified credentials found for this session".to_string(),
        ));
    }

    Ok(SessionCredentialsResponse {
        session_id: request.session_id,
        count: credentials.len(),
        verified_credentials: credentials,
    })
}

impl<P: Provider> Handler<SessionCredentialsResponse, P> for Request<SessionCredentialsRequest> {
    type Error = Error;

    async fn handle(
        self, verifier: &str, provider: &P,
    ) -> Result<Response<SessionCredentialsResponse>> {
        Ok(session_credentials(verifier, provider, self.body).await?.into())
    }
}

/// Credential-by-id lookup handler.
///
/// # Errors
///
/// Returns `not_found` when the credential does not exist.
async fn credential_by_id(
    _verifier: &str, provider: &impl Provider, request: CredentialByIdRequest,
) -> Result<CredentialByIdResponse> {
    let Some(credential) = provider
        .get_verified_by_id(&request.credential_id)
        .await
        .context("fetching verified credential")?
    else {
        return Err(Error::NotFound("Verified credential not found".to_string()));
    };

    Ok(CredentialByIdResponse {
        verified_credential: credential,
    })
}

impl<P: Provider> Handler<CredentialByIdResponse, P> for Request<CredentialByIdRequest> {
    type Error = Error;

    async fn handle(
        self, verifier: &str, provider: &P,
    ) -> Result<Response<CredentialByIdResponse>> {
        Ok(credential_by_id(verifier, provider, self.body).await?.into())
    }
}
