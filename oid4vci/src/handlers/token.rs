//! # Token Endpoint
//!
//! The Token Endpoint issues an Access Token and, for the
//! authorization-code grant, a Refresh Token in exchange for the code the
//! client obtained from the authorize endpoint. A code is redeemable
//! exactly once: redemption goes through the store's atomic consume so two
//! concurrent requests cannot both succeed.

use anyhow::Context as _;
use chrono::Utc;
use eudi_core::generate;
use eudi_store::{AuthorizationCode, IssuanceSession, SessionStatus};
use uuid::Uuid;

use crate::error::invalid;
use crate::handlers::{Handler, Request, Response};
use crate::pkce;
use crate::provider::{AuthorizationCodeStore, IssuanceSessionStore, Provider};
use crate::state::Expire;
use crate::types::{GrantType, TokenRequest, TokenResponse};
use crate::{Error, Result};

/// Token request handler.
///
/// # Errors
///
/// Returns an `OpenID4VCI` error if the request is invalid or if the
/// provider is not available.
async fn token(
    _issuer: &str, provider: &impl Provider, request: TokenRequest,
) -> Result<TokenResponse> {
    if request.grant_type == GrantType::Unknown {
        return Err(Error::UnsupportedGrantType("Unsupported grant type".to_string()));
    }

    let Some(code) = request.code() else {
        return Err(invalid!("Authorization code is required"));
    };
    let Some(auth_code) = provider.get_valid_code(code).await.context("fetching code")? else {
        return Err(Error::InvalidGrant("Invalid or expired authorization code".to_string()));
    };

    request.verify(&auth_code)?;

    // single redemption: only the caller that flips the used flag proceeds
    if !provider.try_consume_code(code).await.context("consuming code")? {
        return Err(Error::InvalidGrant("Invalid or expired authorization code".to_string()));
    }

    let access_token = generate::token();
    let c_nonce = generate::nonce();
    let session = IssuanceSession {
        id: Uuid::new_v4().to_string(),
        auth_code_id: auth_code.id.clone(),
        access_token: access_token.clone(),
        c_nonce: Some(c_nonce.clone()),
        c_nonce_expires_at: Some(Utc::now() + Expire::CNonce.duration()),
        status: SessionStatus::Authorized,
        user_data: auth_code.user_data,
        created_at: Utc::now(),
    };
    provider.create_session(session).await.context("saving issuance session")?;

    let refresh_token = (request.grant_type == GrantType::AuthorizationCode)
        .then(|| Uuid::new_v4().to_string());

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: Expire::Access.duration().num_seconds(),
        c_nonce,
        c_nonce_expires_in: Expire::CNonce.duration().num_seconds(),
        refresh_token,
    })
}

impl<P: Provider> Handler<TokenResponse, P> for Request<TokenRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, provider: &P) -> Result<Response<TokenResponse>> {
        Ok(token(issuer, provider, self.body).await?.into())
    }
}

impl TokenRequest {
    // The code being redeemed. The wire parameter is `pre-authorized_code`
    // for both grants; the standard `code` field is also accepted for the
    // authorization-code grant.
    fn code(&self) -> Option<&str> {
        self.pre_authorized_code.as_deref().or(self.code.as_deref())
    }

    // Verify the token request against the stored code.
    fn verify(&self, auth_code: &AuthorizationCode) -> Result<()> {
        tracing::debug!("token::verify");

        match self.grant_type {
            GrantType::PreAuthorizedCode => {
                // tx_code (PIN)
                if let Some(expected) = &auth_code.tx_code {
                    if self.user_pin.as_ref() != Some(expected) {
                        return Err(Error::InvalidGrant(
                            "Invalid transaction code (user_pin)".to_string(),
                        ));
                    }
                }
            }
            GrantType::AuthorizationCode => {
                // client_id and redirect_uri are the same as the ones used
                // to obtain the authorization code
                if auth_code.client_id != self.client_id {
                    return Err(Error::InvalidClient("Invalid client ID".to_string()));
                }
                if auth_code.redirect_uri != self.redirect_uri {
                    return Err(invalid!("Invalid redirect URI"));
                }

                // verifier matches the challenge received in the
                // authorization request
                if let Some(challenge) = &auth_code.code_challenge {
                    let Some(verifier) = &self.code_verifier else {
                        return Err(invalid!("Code verifier is required for PKCE"));
                    };
                    if !pkce::verify(verifier, challenge) {
                        return Err(Error::InvalidGrant("Invalid PKCE code verifier".to_string()));
                    }
                }
            }
            GrantType::Unknown => {
                return Err(Error::UnsupportedGrantType("Unsupported grant type".to_string()));
            }
        }

        Ok(())
    }
}
