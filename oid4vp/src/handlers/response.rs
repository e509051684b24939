//! # Response Endpoints
//!
//! Where wallet responses land. `finish` accepts the same-device JSON
//! response (a `vp_token` map keyed by credential query id); `callback`
//! accepts the SIOPv2 form post (a VP JWT wrapping the credential). Both
//! validate the presented credential, consume the session's challenge
//! exactly once, persist the verified credential, and drive the
//! verification session to a terminal state.

use anyhow::{Context as _, Result as AnyResult};
use chrono::{DateTime, Utc};
use eudi_core::urlencode;
use eudi_store::{VerificationSession, VerificationStatus, VerifiedCredential};
use eudi_vdc::w3c_vc::CodecError;
use eudi_vdc::{CredentialFormat, Jwk, mso_mdoc, w3c_vc};
use http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::invalid;
use crate::handlers::{Handler, Request, Response};
use crate::provider::{
    ChallengeStore, IssuerKeyStore, Policy, Provider, VerificationSessionStore,
    VerifiedCredentialStore,
};
use crate::types::{CallbackRequest, CallbackResponse, FinishRequest, FinishResponse};
use crate::{Error, Result};

const EXPECTED_CREDENTIAL_ID: &str = "cred1";
const INVALID_CHALLENGE: &str = "Invalid or expired challenge.";

/// Finish request handler.
///
/// # Errors
///
/// Returns an `OpenID4VP` error when the request is malformed (no
/// `vp_token`, no state, wrong credential id) or the provider fails.
/// Rejected presentations return a `{verified: false}` body with HTTP 400
/// and the failure persisted onto the session.
async fn finish(
    _verifier: &str, provider: &impl Provider, request: FinishRequest,
) -> Result<Response<FinishResponse>> {
    // the vp_token map may arrive at the top level or wrapped in `data`;
    // without one there is nothing to verify and the store is not touched
    let vp_token = match (&request.vp_token, &request.data) {
        (Some(map), _) => map.clone(),
        (None, Some(data)) => data
            .vp_token
            .clone()
            .ok_or_else(|| invalid!("vp_token not found in the request data"))?,
        (None, None) => return Err(invalid!("vp_token not found in the request data")),
    };
    let Some(state) = &request.state else {
        return Err(invalid!("State information not found in the request data"));
    };

    let Some(token) = vp_token.get(EXPECTED_CREDENTIAL_ID) else {
        let available = vp_token.keys().cloned().collect::<Vec<_>>().join(", ");
        return Err(invalid!(
            "Credential not found for ID: {EXPECTED_CREDENTIAL_ID}. Available IDs: {available}"
        ));
    };
    let Some(token) = token.as_str() else {
        return Err(invalid!("Credential for ID {EXPECTED_CREDENTIAL_ID} is not a string"));
    };

    // the challenge gates everything else: replayed or expired nonces fail
    // before any credential inspection
    let Some(challenge) =
        provider.get_valid_challenge(&state.nonce).await.context("fetching challenge")?
    else {
        return Ok(Response::new(
            StatusCode::BAD_REQUEST,
            FinishResponse::failure(INVALID_CHALLENGE),
        ));
    };

    let session = resolve_session(provider, &challenge.id).await?;

    let format = request.format.unwrap_or(CredentialFormat::JwtVc);
    let outcome = match format {
        CredentialFormat::MsoMdoc => validate_mdoc_credential(token, &state.nonce),
        _ => validate_jwt_credential(provider, token).await?,
    };

    let validated = match outcome {
        Outcome::Valid(validated) => validated,
        Outcome::Invalid(message) => {
            provider
                .update_verification(
                    &session.id,
                    VerificationStatus::Failed,
                    None,
                    Some(message.clone()),
                )
                .await
                .context("updating session")?;
            let mut failure = FinishResponse::failure(message);
            failure.session_id = Some(session.id);
            return Ok(Response::new(StatusCode::BAD_REQUEST, failure));
        }
    };

    // consume the challenge: only the caller that flips the used flag may
    // record the verification
    if !provider.try_consume_challenge(&state.nonce).await.context("consuming challenge")? {
        return Ok(Response::new(
            StatusCode::BAD_REQUEST,
            FinishResponse::failure(INVALID_CHALLENGE),
        ));
    }

    let credential_data =
        extract_credential_data(&validated.payload, token, EXPECTED_CREDENTIAL_ID, format);
    let verification_method = match format {
        CredentialFormat::MsoMdoc => "structural_validation",
        _ => "jwt_validation",
    };
    let details = json!({
        "protocol": "openid4vp",
        "format": format.to_string(),
        "docType": credential_data["doctype"],
        "credential_type": state.credential_type,
        "verification_method": verification_method,
        "signature_verified": validated.signature_verified,
        "challenge_verified": true,
        "processed_credential_id": EXPECTED_CREDENTIAL_ID,
        "token_length": token.len(),
        "issuer": credential_data["decoded_credential"]["issuer"],
        "subject": credential_data["decoded_credential"]["subject"],
    });

    let verified = VerifiedCredential {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        credential_type: credential_data["doctype"]
            .as_str()
            .unwrap_or(eudi_vdc::PID_CREDENTIAL_TYPE)
            .to_string(),
        issuer: credential_data["decoded_credential"]["issuer"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        subject: credential_data["decoded_credential"]["subject"]
            .as_str()
            .map(ToString::to_string),
        claims: credential_data["decoded_credential"]["credential_subject"].clone(),
        verified_at: Utc::now(),
    };
    provider.create_verified(verified).await.context("saving verified credential")?;

    provider
        .update_verification(
            &session.id,
            VerificationStatus::Verified,
            Some(json!({
                "token": token,
                "verificationDetails": details,
                "credentialData": credential_data,
            })),
            None,
        )
        .await
        .context("updating session")?;

    Ok(Response::from(FinishResponse {
        verified: true,
        message: match format {
            CredentialFormat::MsoMdoc => "mdoc credential verified successfully!".to_string(),
            _ => "JWT credential verified successfully!".to_string(),
        },
        session_id: Some(session.id),
        details: Some(details),
        credential_data: Some(credential_data),
    }))
}

impl<P: Provider> Handler<FinishResponse, P> for Request<FinishRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, provider: &P) -> Result<Response<FinishResponse>> {
        finish(verifier, provider, self.body).await
    }
}

/// SIOPv2 callback handler. Outcomes are delivered as redirects to the UI
/// result page; failures carry an `error` query parameter.
///
/// # Errors
///
/// Returns an `OpenID4VP` error only when the provider fails; wallet errors
/// and rejected credentials become error redirects.
async fn callback(
    verifier: &str, provider: &impl Provider, request: CallbackRequest,
) -> Result<CallbackResponse> {
    let redirect_err =
        |message: &str| format!("{verifier}/verify?error={}", urlencode::component(message));

    if let Some(error) = &request.error {
        let description = request.error_description.as_deref().unwrap_or(error);
        tracing::warn!("wallet returned verification error: {description}");
        return Ok(CallbackResponse {
            redirect_to: redirect_err(description),
        });
    }
    let Some(state) = &request.state else {
        return Ok(CallbackResponse {
            redirect_to: redirect_err("Missing state parameter"),
        });
    };
    let Some(vp_token) = &request.vp_token else {
        return Ok(CallbackResponse {
            redirect_to: redirect_err("Missing verifiable presentation token"),
        });
    };

    let Some(session) = provider.get_verification(state).await.context("fetching session")?
    else {
        return Ok(CallbackResponse {
            redirect_to: redirect_err("Invalid verification session"),
        });
    };

    // the VP JWT wraps the credential under vp.verifiableCredential
    let credential = w3c_vc::decode_unverified(vp_token)
        .ok()
        .and_then(|vp| vp.pointer("/vp/verifiableCredential/0").cloned())
        .and_then(|vc| vc.as_str().map(ToString::to_string));
    let Some(credential) = credential else {
        fail_session(provider, &session, "No verifiable credential found in presentation")
            .await?;
        return Ok(CallbackResponse {
            redirect_to: redirect_err("Credential processing failed"),
        });
    };

    let validated = match validate_jwt_credential(provider, &credential).await? {
        Outcome::Valid(validated) => validated,
        Outcome::Invalid(message) => {
            fail_session(provider, &session, &message).await?;
            return Ok(CallbackResponse {
                redirect_to: redirect_err("Credential processing failed"),
            });
        }
    };

    let credential_data = extract_credential_data(
        &validated.payload,
        &credential,
        "credential",
        CredentialFormat::JwtVc,
    );

    let verified_credential_id = Uuid::new_v4().to_string();
    let verified = VerifiedCredential {
        id: verified_credential_id.clone(),
        session_id: session.id.clone(),
        credential_type: credential_data["doctype"]
            .as_str()
            .unwrap_or(eudi_vdc::PID_CREDENTIAL_TYPE)
            .to_string(),
        issuer: credential_data["decoded_credential"]["issuer"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        subject: credential_data["decoded_credential"]["subject"]
            .as_str()
            .map(ToString::to_string),
        claims: credential_data["decoded_credential"]["credential_subject"].clone(),
        verified_at: Utc::now(),
    };
    provider.create_verified(verified).await.context("saving verified credential")?;

    provider
        .update_verification(
            &session.id,
            VerificationStatus::Verified,
            Some(json!({
                "vpToken": vp_token,
                "idToken": request.id_token,
                "credentialData": credential_data,
                "verifiedCredentialId": verified_credential_id,
            })),
            None,
        )
        .await
        .context("updating session")?;

    Ok(CallbackResponse {
        redirect_to: format!("{verifier}/verify?success=true&sessionId={}", session.id),
    })
}

impl<P: Provider> Handler<CallbackResponse, P> for Request<CallbackRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, provider: &P) -> Result<Response<CallbackResponse>> {
        Ok(callback(verifier, provider, self.body).await?.into())
    }
}

// Outcome of credential validation: protocol-expected rejections are data,
// not errors.
enum Outcome {
    Valid(Validated),
    Invalid(String),
}

struct Validated {
    payload: Value,
    signature_verified: bool,
}

// The jwt_vc pipeline: structural shape, expiry, then signature against
// the issuer's registered key. An unregistered issuer is accepted (with a
// warning) only when the provider policy allows it.
async fn validate_jwt_credential(
    provider: &impl Provider, token: &str,
) -> AnyResult<Outcome, Error> {
    let payload = match w3c_vc::decode_unverified(token) {
        Ok(payload) => payload,
        Err(CodecError::Format) => return Ok(Outcome::Invalid("Invalid JWT format".to_string())),
        Err(e) => return Ok(Outcome::Invalid(format!("JWT validation failed: {e}"))),
    };

    if payload.pointer("/vc/credentialSubject").is_none() {
        return Ok(Outcome::Invalid("Invalid credential structure".to_string()));
    }
    if let Some(exp) = payload.get("exp").and_then(Value::as_i64) {
        if exp < Utc::now().timestamp() {
            return Ok(Outcome::Invalid("Credential has expired".to_string()));
        }
    }
    let Some(issuer_did) = payload.get("iss").and_then(Value::as_str) else {
        return Ok(Outcome::Invalid("No issuer DID found in credential".to_string()));
    };

    let Some(issuer_key) =
        provider.get_key_by_issuer_did(issuer_did).await.context("fetching issuer key")?
    else {
        if provider.allow_unknown_issuer() {
            tracing::warn!("issuer key not found for {issuer_did}, skipping signature verification");
            return Ok(Outcome::Valid(Validated {
                payload,
                signature_verified: false,
            }));
        }
        return Ok(Outcome::Invalid(format!("Unknown credential issuer: {issuer_did}")));
    };

    let public_jwk: Jwk =
        serde_json::from_str(&issuer_key.public_jwk).context("parsing issuer public JWK")?;
    let verification = w3c_vc::verify(token, &public_jwk);
    if !verification.is_valid {
        return Ok(Outcome::Invalid(
            verification.error.unwrap_or_else(|| "JWT credential validation failed".to_string()),
        ));
    }

    Ok(Outcome::Valid(Validated {
        payload,
        signature_verified: true,
    }))
}

// The mso_mdoc pipeline: a minimal structural check only. Issuer-signature
// and device-auth verification are not implemented for this format.
fn validate_mdoc_credential(token: &str, nonce: &str) -> Outcome {
    if token.is_empty() || nonce.is_empty() {
        return Outcome::Invalid("Empty mdoc credential or nonce".to_string());
    }
    match mso_mdoc::decode_namespaces(token) {
        Ok(namespaces) => Outcome::Valid(Validated {
            payload: json!({ "namespaces": namespaces }),
            signature_verified: false,
        }),
        Err(e) => Outcome::Invalid(format!("mdoc decoding failed: {e}")),
    }
}

// Display-oriented extraction of the validated credential.
fn extract_credential_data(
    payload: &Value, token: &str, credential_id: &str, format: CredentialFormat,
) -> Value {
    let subject = payload.pointer("/vc/credentialSubject").cloned().unwrap_or(Value::Null);
    let doctype = payload
        .pointer("/vc/type/1")
        .and_then(Value::as_str)
        .unwrap_or(eudi_vdc::PID_CREDENTIAL_TYPE);

    json!({
        "credential_id": credential_id,
        "extracted_at": Utc::now().to_rfc3339(),
        "format": format.to_string(),
        "doctype": doctype,
        "raw_credential": token,
        "decoded_credential": {
            "issuer": payload.get("iss"),
            "subject": payload.get("sub"),
            "issued_at": payload.get("iat").and_then(Value::as_i64).map(to_rfc3339),
            "expires_at": payload.get("exp").and_then(Value::as_i64).map(to_rfc3339),
            "credential_subject": subject,
            "credential_type": payload.pointer("/vc/type"),
            "credential_schema": payload.pointer("/vc/credentialSchema"),
            "namespaces": payload.get("namespaces"),
        },
    })
}

async fn resolve_session(
    provider: &impl Provider, challenge_id: &str,
) -> AnyResult<VerificationSession, Error> {
    if let Some(session) = provider
        .get_verification_by_challenge(challenge_id)
        .await
        .context("fetching session")?
    {
        return Ok(session);
    }

    // a wallet-constructed state may reference a challenge with no session;
    // record the attempt under a fresh one
    let session = VerificationSession {
        id: Uuid::new_v4().to_string(),
        challenge_id: challenge_id.to_string(),
        status: VerificationStatus::Pending,
        presentation_data: None,
        error: None,
        verified_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    provider.create_verification(session.clone()).await.context("saving session")?;
    Ok(session)
}

async fn fail_session(
    provider: &impl Provider, session: &VerificationSession, message: &str,
) -> AnyResult<(), Error> {
    provider
        .update_verification(
            &session.id,
            VerificationStatus::Failed,
            None,
            Some(message.to_string()),
        )
        .await
        .context("updating session")?;
    Ok(())
}

fn to_rfc3339(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0).unwrap_or_default().to_rfc3339()
}
