//! # Request Object Endpoint
//!
//! This endpoint is used by the wallet to retrieve the signed SIOPv2
//! request object for a previously created verification session. The JWT
//! header embeds the verifier's public JWK directly (`jwk`) alongside the
//! `kid`, so a wallet can verify the signature without a separate key
//! fetch.

use anyhow::Context as _;
use chrono::Utc;
use eudi_vdc::{did_web, verifier_key_pair};
use jsonwebtoken::{Algorithm, Header};
use serde_json::json;

use crate::handlers::{Handler, Request, Response};
use crate::provider::{Provider, VerificationSessionStore};
use crate::state::Expire;
use crate::types::{
    RequestObjectClaims, RequestObjectRequest, RequestObjectResponse, VpTokenRequest,
};
use crate::{Error, Result};

/// Request-object handler.
///
/// # Errors
///
/// Returns `not_found` when the session is unknown and `server_error` when
/// signing fails.
async fn request_object(
    verifier: &str, provider: &impl Provider, request: RequestObjectRequest,
) -> Result<RequestObjectResponse> {
    let Some(session) =
        provider.get_verification(&request.id).await.context("fetching session")?
    else {
        return Err(Error::NotFound("Verification session not found".to_string()));
    };

    let verifier_did = format!("{}:verifier", did_web(verifier));
    let pair = verifier_key_pair(&verifier_did)
        .map_err(|e| Error::ServerError(format!("Failed to get verifier key: {e}")))?;

    let now = Utc::now().timestamp();
    let claims = RequestObjectClaims {
        client_id: format!("{verifier}/verify/openid4vci"),
        iss: verifier.to_string(),
        aud: verifier_did.clone(),
        iat: now,
        exp: now + Expire::Request.duration().num_seconds(),
        nonce: session.challenge_id,
        response_type: "id_token".to_string(),
        scope: "openid".to_string(),
        version: "2.0".to_string(),
        siop_version: "2.0".to_string(),
        state: session.id,
        response_mode: "form_post".to_string(),
        response_uri: format!("{verifier}/verify/openid4vci/callback"),
        vp_token: VpTokenRequest {
            presentation_definition: presentation_definition(),
        },
        registration: json!({
            "jwks_uri": format!("{verifier}/verify/openid4vci/jwks"),
            "client_name": "Digital Credentials Verifier",
            "client_uri": verifier,
            "logo_uri": format!("{verifier}/logo.png"),
            "vp_formats": {
                "jwt_vc": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]},
                "jwt_vp": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]},
                "jwt": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]}
            }
        }),
    };

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(format!("{verifier_did}#verifier-key-1"));
    header.jwk = Some(
        serde_json::from_value(
            serde_json::to_value(&pair.public_jwk).context("serializing verifier JWK")?,
        )
        .context("embedding verifier JWK")?,
    );

    let key = pair
        .encoding_key()
        .map_err(|e| Error::ServerError(format!("Verifier key unusable: {e}")))?;
    let jwt = jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| Error::ServerError(format!("Failed to sign request object: {e}")))?;

    Ok(RequestObjectResponse { jwt })
}

impl<P: Provider> Handler<RequestObjectResponse, P> for Request<RequestObjectRequest> {
    type Error = Error;

    async fn handle(
        self, verifier: &str, provider: &P,
    ) -> Result<Response<RequestObjectResponse>> {
        Ok(request_object(verifier, provider, self.body).await?.into())
    }
}

// The full PID constraint set: every subject field the wallet should
// disclose, with the signature algorithms and formats the verifier accepts.
fn presentation_definition() -> crate::types::PresentationDefinition {
    use crate::types::{Constraints, FieldConstraint, InputDescriptor, PresentationDefinition};

    let date = json!({"type": "string", "pattern": r"\d{4}-\d{2}-\d{2}"});
    let any = json!({"type": "string", "pattern": ".*"});

    let fields = [
        ("givenName", &any),
        ("familyName", &any),
        ("birthDate", &date),
        ("ageOver18", &any),
        ("ageOver21", &any),
        ("documentNumber", &any),
        ("issuingCountry", &any),
        ("issuingAuthority", &any),
        ("issueDate", &date),
        ("expiryDate", &date),
    ]
    .into_iter()
    .map(|(claim, filter)| FieldConstraint {
        path: vec![format!("$.vc.credentialSubject.{claim}")],
        filter: Some(filter.clone()),
        purpose: None,
    })
    .collect();

    PresentationDefinition {
        id: "pid-verification".to_string(),
        input_descriptors: vec![InputDescriptor {
            id: "pid-credential".to_string(),
            name: "EU Digital Identity (PID)".to_string(),
            purpose: "We need to verify your EU Digital Identity credential".to_string(),
            constraints: Constraints { fields },
            format: Some(json!({
                "jwt_vc": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]},
                "jwt_vp": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]},
                "jwt": {"alg": ["ES256", "ES384", "ES512", "RS256", "RS384", "RS512"]},
                "vc+sd-jwt": {}
            })),
        }],
    }
}
