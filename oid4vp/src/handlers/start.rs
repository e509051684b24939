//! # Start Endpoint
//!
//! Begins a same-device presentation: mints a fresh challenge and a pending
//! verification session, and returns the presentation request in both query
//! dialects (a DCQL query for the Digital Credentials API and a legacy
//! static presentation definition). Expired challenges are swept by a
//! fire-and-forget task whose failure is logged and otherwise ignored.

use anyhow::Context as _;
use chrono::Utc;
use eudi_store::{Challenge, VerificationSession, VerificationStatus};
use eudi_vdc::CredentialFormat;
use serde_json::json;
use uuid::Uuid;

use crate::handlers::{Handler, Request, Response};
use crate::provider::{ChallengeStore, Provider, VerificationSessionStore};
use crate::state::Expire;
use crate::types::{
    ClaimQuery, Constraints, CredentialQuery, DcqlQuery, FieldConstraint, InputDescriptor,
    MetadataQuery, PresentationDefinition, StartRequest, StartResponse, StateParam,
};
use crate::{Error, Result};

/// Start request handler.
///
/// # Errors
///
/// Returns an `OpenID4VP` error if the provider is not available.
async fn start(
    _verifier: &str, provider: &impl Provider, request: StartRequest,
) -> Result<StartResponse> {
    let challenge_value = Uuid::new_v4().to_string();
    let challenge = Challenge {
        id: Uuid::new_v4().to_string(),
        value: challenge_value.clone(),
        expires_at: Utc::now() + Expire::Challenge.duration(),
        created_at: Utc::now(),
        used: false,
    };
    provider.create_challenge(challenge.clone()).await.context("saving challenge")?;

    let session = VerificationSession {
        id: Uuid::new_v4().to_string(),
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

    let format = request.format.unwrap_or(CredentialFormat::JwtVc);

    Ok(StartResponse {
        challenge: challenge_value.clone(),
        state: StateParam {
            credential_type: eudi_vdc::PID_CREDENTIAL_TYPE.to_string(),
            nonce: challenge_value,
            challenge_id: challenge.id,
        },
        dcql_query: dcql_query(format),
        presentation_definition: legacy_definition(),
    })
}

impl<P: Provider> Handler<StartResponse, P> for Request<StartRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, provider: &P) -> Result<Response<StartResponse>> {
        Ok(start(verifier, provider, self.body).await?.into())
    }
}

// The DCQL query for the PID claims, in the requested format's claim-path
// dialect.
fn dcql_query(format: CredentialFormat) -> DcqlQuery {
    let query = match format {
        CredentialFormat::MsoMdoc => CredentialQuery {
            id: "cred1".to_string(),
            format,
            meta: Some(MetadataQuery {
                doctype_value: Some(eudi_vdc::PID_CREDENTIAL_TYPE.to_string()),
                type_values: None,
            }),
            claims: Some(
                ["family_name", "given_name", "birth_date", "age_over_18", "document_number"]
                    .into_iter()
                    .map(|claim| ClaimQuery {
                        path: vec![eudi_vdc::PID_CREDENTIAL_TYPE.to_string(), claim.to_string()],
                    })
                    .collect(),
            ),
        },
        _ => CredentialQuery {
            id: "cred1".to_string(),
            format: CredentialFormat::JwtVc,
            meta: Some(MetadataQuery {
                doctype_value: None,
                type_values: Some(vec![vec![
                    "VerifiableCredential".to_string(),
                    eudi_vdc::PID_CREDENTIAL_TYPE.to_string(),
                ]]),
            }),
            claims: Some(
                ["givenName", "familyName", "birthDate", "ageOver18", "documentNumber"]
                    .into_iter()
                    .map(|claim| ClaimQuery {
                        path: vec!["credentialSubject".to_string(), claim.to_string()],
                    })
                    .collect(),
            ),
        },
    };

    DcqlQuery {
        credentials: vec![query],
    }
}

// The static presentation definition retained for wallets that predate
// DCQL.
fn legacy_definition() -> PresentationDefinition {
    PresentationDefinition {
        id: "12345678-90ab-cdef-1234-567890abcdef".to_string(),
        input_descriptors: vec![InputDescriptor {
            id: "pid-credential".to_string(),
            name: "EU Digital Identity (PID)".to_string(),
            purpose: "We need to verify your EU Digital Identity credential".to_string(),
            constraints: Constraints {
                fields: vec![
                    FieldConstraint {
                        path: vec!["$.type".to_string()],
                        filter: Some(json!({"type": "string", "const": "VerifiableCredential"})),
                        purpose: None,
                    },
                    FieldConstraint {
                        path: vec!["$.vc.credentialSubject.givenName".to_string()],
                        filter: Some(json!({"type": "string", "pattern": ".*"})),
                        purpose: None,
                    },
                    FieldConstraint {
                        path: vec!["$.vc.credentialSubject.familyName".to_string()],
                        filter: Some(json!({"type": "string", "pattern": ".*"})),
                        purpose: None,
                    },
                    FieldConstraint {
                        path: vec!["$.vc.credentialSubject.birthDate".to_string()],
                        filter: Some(json!({"type": "string", "pattern": r"\d{4}-\d{2}-\d{2}"})),
                        purpose: None,
                    },
                ],
            },
            format: Some(json!({
                "jwt_vc": {"alg": ["ES256", "ES384", "ES512"]},
                "jwt_vp": {"alg": ["ES256", "ES384", "ES512"]}
            })),
        }],
    }
}
