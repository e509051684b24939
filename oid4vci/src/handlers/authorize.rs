//! # Authorize Endpoint
//!
//! Two entry points share this endpoint. A holder-facing request carrying
//! identity claims yields a credential offer with a pre-authorized code and
//! a transaction code (PIN) for out-of-band confirmation. A wallet-facing
//! [RFC6749](https://tools.ietf.org/html/rfc6749#section-4.1.2) authorization
//! request yields a standard authorization code delivered by redirect.

use anyhow::Context as _;
use chrono::Utc;
use eudi_core::{generate, urlencode};
use eudi_store::AuthorizationCode;
use uuid::Uuid;

use crate::error::invalid;
use crate::handlers::{Handler, Request, Response};
use crate::provider::{AuthorizationCodeStore, Provider};
use crate::state::Expire;
use crate::types::{
    AuthCodeRequest, AuthCodeResponse, AuthorizeRequest, AuthorizeResponse, CredentialOffer,
    FormatAlgorithms, Grants, PreAuthorizedCodeGrant, SupportedFormats,
};
use crate::{Error, Result};

/// Credential-offer request handler.
///
/// # Errors
///
/// Returns `missing_user_data` when the mandatory holder claims are absent.
async fn authorize(
    issuer: &str, provider: &impl Provider, request: AuthorizeRequest,
) -> Result<AuthorizeResponse> {
    let Some(user_data) = request.user_data else {
        return Err(Error::MissingUserData(
            "Required user data (given_name, family_name, birth_date) is missing".to_string(),
        ));
    };
    if user_data.given_name.is_empty()
        || user_data.family_name.is_empty()
        || user_data.birth_date.is_empty()
    {
        return Err(Error::MissingUserData(
            "Required user data (given_name, family_name, birth_date) is missing".to_string(),
        ));
    }

    let code = Uuid::new_v4().to_string();
    let tx_code = generate::tx_code();
    let expires_in = Expire::PreAuthorizedCode.duration();

    // holder data and the transaction code ride on the code row so they
    // expire with it
    let auth_code = AuthorizationCode {
        id: Uuid::new_v4().to_string(),
        code: code.clone(),
        client_id: None,
        scope: Some(eudi_vdc::PID_CREDENTIAL_TYPE.to_string()),
        code_challenge: None,
        code_challenge_method: None,
        redirect_uri: None,
        tx_code: Some(tx_code.clone()),
        user_data: Some(serde_json::to_value(&user_data).context("serializing user data")?),
        expires_at: Utc::now() + expires_in,
        used: false,
    };
    provider.create_code(auth_code).await.context("saving authorization code")?;

    tracing::debug!("authorize: pre-authorized code issued");

    let credential_offer = CredentialOffer {
        credential_issuer: issuer.to_string(),
        credential_configuration_ids: vec![eudi_vdc::PID_CREDENTIAL_TYPE.to_string()],
        grants: Grants {
            pre_authorized_code: PreAuthorizedCodeGrant {
                pre_authorized_code: code.clone(),
                user_pin_required: true,
                tx_code: tx_code.clone(),
            },
        },
        supported_formats: SupportedFormats {
            jwt_vc: FormatAlgorithms {
                alg: vec!["ES256".to_string()],
            },
        },
    };

    let offer_json =
        serde_json::to_string(&credential_offer).context("serializing credential offer")?;
    let credential_offer_uri = format!(
        "openid-credential-offer://?credential_offer={}",
        urlencode::component(&offer_json)
    );

    Ok(AuthorizeResponse {
        credential_offer,
        credential_offer_uri: credential_offer_uri.clone(),
        pre_authorized_code: code,
        tx_code,
        expires_in: expires_in.num_seconds(),
        qr_code_data: credential_offer_uri,
    })
}

impl<P: Provider> Handler<AuthorizeResponse, P> for Request<AuthorizeRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, provider: &P) -> Result<Response<AuthorizeResponse>> {
        Ok(authorize(issuer, provider, self.body).await?.into())
    }
}

/// Standard OAuth authorization handler. The demo auto-approves: a consent
/// screen would sit in front of this in a real deployment.
///
/// # Errors
///
/// Returns an `OpenID4VCI` error if the request is invalid.
async fn auth_code(
    _issuer: &str, provider: &impl Provider, request: AuthCodeRequest,
) -> Result<AuthCodeResponse> {
    if request.response_type.as_deref() != Some("code") {
        return Err(Error::UnsupportedResponseType(
            "Only 'code' response type is supported".to_string(),
        ));
    }
    let Some(client_id) = request.client_id else {
        return Err(invalid!("client_id and redirect_uri are required"));
    };
    let Some(redirect_uri) = request.redirect_uri else {
        return Err(invalid!("client_id and redirect_uri are required"));
    };

    let code = Uuid::new_v4().to_string();
    let auth_code = AuthorizationCode {
        id: Uuid::new_v4().to_string(),
        code: code.clone(),
        client_id: Some(client_id),
        scope: request.scope.or_else(|| Some(eudi_vdc::PID_CREDENTIAL_TYPE.to_string())),
        code_challenge: request.code_challenge,
        code_challenge_method: request.code_challenge_method,
        redirect_uri: Some(redirect_uri.clone()),
        tx_code: None,
        user_data: None,
        expires_at: Utc::now() + Expire::AuthorizationCode.duration(),
        used: false,
    };
    provider.create_code(auth_code).await.context("saving authorization code")?;

    let mut redirect_to = format!("{redirect_uri}?code={code}");
    if let Some(state) = &request.state {
        redirect_to = format!("{redirect_to}&state={}", urlencode::component(state));
    }

    Ok(AuthCodeResponse {
        code,
        state: request.state,
        redirect_to,
    })
}

impl<P: Provider> Handler<AuthCodeResponse, P> for Request<AuthCodeRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, provider: &P) -> Result<Response<AuthCodeResponse>> {
        Ok(auth_code(issuer, provider, self.body).await?.into())
    }
}
