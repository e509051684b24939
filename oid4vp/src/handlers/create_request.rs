//! # SIOPv2 Start Endpoint
//!
//! Prepares a cross-device presentation: mints a challenge and a pending
//! session, and returns the verification URL a wallet opens. The URL
//! carries a `request_uri` from which the wallet fetches the signed request
//! object.

use anyhow::Context as _;
use chrono::Utc;
use eudi_core::urlencode;
use eudi_store::{Challenge, VerificationSession, VerificationStatus};
use uuid::Uuid;

use crate::handlers::{Handler, Request, Response};
use crate::provider::{ChallengeStore, Provider, VerificationSessionStore};
use crate::state::Expire;
use crate::types::{SiopStartRequest, SiopStartResponse};
use crate::{Error, Result};

/// SIOPv2 start request handler.
///
/// # Errors
///
/// Returns an `OpenID4VP` error if the provider is not available.
async fn create_request(
    verifier: &str, provider: &impl Provider, _request: SiopStartRequest,
) -> Result<SiopStartResponse> {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Expire::SiopChallenge.duration();

    let challenge = Challenge {
        id: Uuid::new_v4().to_string(),
        value: Uuid::new_v4().to_string(),
        expires_at,
        created_at: Utc::now(),
        used: false,
    };
    provider.create_challenge(challenge.clone()).await.context("saving challenge")?;

    let session = VerificationSession {
        id: session_id.clone(),
        challenge_id: challenge.id.clone(),
        status: VerificationStatus::Pending,
        presentation_data: None,
        error: None,
        verified_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    provider.create_verification(session).await.context("saving verification session")?;

    // background sweep of expired challenges; not awaited by this request
    let cleanup = provider.clone();
    tokio::spawn(async move {
        if let Err(e) = cleanup.delete_expired_challenges().await {
            tracing::warn!("expired-challenge cleanup failed: {e}");
        }
    });

    let client_id = format!("{verifier}/verify/openid4vci");
    let response_uri = format!("{verifier}/verify/openid4vci/callback");
    let request_uri = format!("{verifier}/verify/openid4vci/request/{session_id}");

    let verification_url = format!(
        "{verifier}/verify/auth?client_id={}&response_uri={}&request_uri={}",
        urlencode::component(&client_id),
        urlencode::component(&response_uri),
        urlencode::component(&request_uri),
    );

    Ok(SiopStartResponse {
        session_id,
        verification_url,
        challenge: challenge.value,
        expires_at,
    })
}

impl<P: Provider> Handler<SiopStartResponse, P> for Request<SiopStartRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, provider: &P) -> Result<Response<SiopStartResponse>> {
        Ok(create_request(verifier, provider, self.body).await?.into())
    }
}
