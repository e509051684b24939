//! # Credential Endpoint
//!
//! The Credential Endpoint issues a PID credential as approved by the
//! End-User upon presentation of a valid Access Token. Issuance signs with
//! the active issuer key, records an append-only audit row, advances the
//! session, and rotates the session's `c_nonce` for any follow-up request.

use anyhow::Context as _;
use chrono::Utc;
use eudi_core::generate;
use eudi_store::{IssuedCredential, IssuerKey, SessionStatus};
use eudi_vdc::w3c_vc::{PidClaims, VcBuilder};
use eudi_vdc::{CredentialFormat, KeyPair, did_web};
use uuid::Uuid;

use crate::error::server;
use crate::handlers::{CredentialHeaders, Handler, Request, Response};
use crate::provider::{
    IssuanceSessionStore, IssuedCredentialStore, IssuerKeyStore, Provider,
};
use crate::state::Expire;
use crate::types::{CredentialRequest, CredentialResponse};
use crate::{Error, Result};

/// Credential request handler.
///
/// # Errors
///
/// Returns an `OpenID4VCI` error if the access token is invalid, the
/// requested format or type is unsupported, or the provider is not
/// available.
async fn credential(
    issuer: &str, provider: &impl Provider,
    request: Request<CredentialRequest, CredentialHeaders>,
) -> Result<CredentialResponse> {
    let Some(session) = provider
        .get_session_by_token(&request.headers.authorization)
        .await
        .context("fetching session")?
    else {
        return Err(Error::InvalidToken("Invalid access token".to_string()));
    };

    let request = request.body;
    request.verify()?;

    let Some(user_data) = &session.user_data else {
        return Err(Error::MissingUserData(
            "User data not found in issuance session".to_string(),
        ));
    };
    let claims = dataset(user_data)?;

    let key_pair = get_or_create_active_key(provider, issuer).await?;

    // subject binding is derived from the wallet's proof JWT; an anonymous
    // request falls back to the credential's own identifier
    let credential_id = Uuid::new_v4().to_string();
    let subject_id = request
        .proof
        .as_ref()
        .and_then(|proof| proof.jwt.as_ref())
        .map_or_else(|| format!("urn:uuid:{credential_id}"), |jwt| format!("did:jwt:{jwt}"));

    let credential_type =
        request.credential_type.unwrap_or_else(|| eudi_vdc::PID_CREDENTIAL_TYPE.to_string());
    let encoded = VcBuilder::new(&claims, &key_pair)
        .subject_id(&subject_id)
        .credential_type(&credential_type)
        .schema_uri(format!("{issuer}/api/schemas/pid"))
        .build()
        .context("signing credential")?;

    let issued = IssuedCredential {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        credential_id,
        format: CredentialFormat::JwtVc.to_string(),
        credential_type,
        credential: encoded.clone(),
        claims: serde_json::to_value(&claims).context("serializing claims")?,
        issuer_key_id: key_pair.key_id.clone(),
        subject_id,
        issued_at: Utc::now(),
        expires_at: Utc::now() + Expire::Credential.duration(),
        revoked: false,
    };
    provider.create_issued(issued).await.context("saving issued credential")?;

    // advance the session and rotate its c_nonce for any follow-up request
    let c_nonce = generate::nonce();
    let c_nonce_expires_at = Utc::now() + Expire::CNonce.duration();
    provider
        .update_session(
            &session.id,
            SessionStatus::CredentialIssued,
            Some(c_nonce.clone()),
            Some(c_nonce_expires_at),
        )
        .await
        .context("updating session")?;

    tracing::debug!("credential: issued for session {}", session.id);

    Ok(CredentialResponse {
        format: CredentialFormat::JwtVc,
        credential: encoded,
        c_nonce,
        c_nonce_expires_in: Expire::CNonce.duration().num_seconds(),
    })
}

impl<P: Provider> Handler<CredentialResponse, P>
    for Request<CredentialRequest, CredentialHeaders>
{
    type Error = Error;

    async fn handle(self, issuer: &str, provider: &P) -> Result<Response<CredentialResponse>> {
        Ok(credential(issuer, provider, self).await?.into())
    }
}

impl CredentialRequest {
    // Verify the credential request: only the jwt_vc rendering of the PID
    // credential is mintable.
    fn verify(&self) -> Result<()> {
        tracing::debug!("credential::verify");

        if self.format != Some(CredentialFormat::JwtVc) {
            return Err(Error::UnsupportedCredentialFormat(
                "Only jwt_vc format is supported".to_string(),
            ));
        }
        if let Some(credential_type) = &self.credential_type {
            if credential_type != eudi_vdc::PID_CREDENTIAL_TYPE {
                return Err(Error::UnsupportedCredentialType(format!(
                    "Only {} credential type is supported",
                    eudi_vdc::PID_CREDENTIAL_TYPE
                )));
            }
        }
        Ok(())
    }
}

// Fill optional claims the holder did not supply with the issuer's fixed
// defaults.
fn dataset(user_data: &serde_json::Value) -> Result<PidClaims> {
    let mut claims: PidClaims =
        serde_json::from_value(user_data.clone()).context("parsing session user data")?;

    claims.age_over_18 = claims.age_over_18.or(Some(true));
    claims.age_over_21 = claims.age_over_21.or(Some(true));
    claims.document_number = claims.document_number.or_else(|| Some("123456789".to_string()));
    claims.expiry_date = claims.expiry_date.or_else(|| Some("2030-12-31".to_string()));
    claims.issue_date =
        claims.issue_date.or_else(|| Some(Utc::now().format("%Y-%m-%d").to_string()));
    claims.issuing_country = claims.issuing_country.or_else(|| Some("EU".to_string()));
    claims.issuing_authority =
        claims.issuing_authority.or_else(|| Some("Digital Credentials Issuer".to_string()));

    Ok(claims)
}

/// The active issuer key as an operable pair, generated and persisted on
/// first use. The store arbitrates concurrent first use: whichever key row
/// lands first is returned to every caller.
///
/// # Errors
///
/// Returns `server_error` when key material cannot be generated, persisted,
/// or reimported.
pub async fn get_or_create_active_key(
    provider: &impl IssuerKeyStore, issuer: &str,
) -> Result<KeyPair> {
    let issuer_did = did_web(issuer);

    let key = match provider.get_active_key().await.context("fetching issuer key")? {
        Some(key) => key,
        None => {
            let pair = KeyPair::generate("issuer-key-1", &issuer_did)
                .map_err(|e| server!("Failed to generate issuer key: {e}"))?;
            let key = IssuerKey {
                id: Uuid::new_v4().to_string(),
                key_id: pair.key_id.clone(),
                issuer_did: issuer_did.clone(),
                key_type: "EC".to_string(),
                algorithm: pair.algorithm.clone(),
                public_jwk: serde_json::to_string(&pair.public_jwk)
                    .context("serializing public JWK")?,
                private_jwk: serde_json::to_string(&pair.private_jwk)
                    .context("serializing private JWK")?,
                is_active: true,
                created_at: Utc::now(),
            };
            provider.create_key(key).await.context("saving issuer key")?
        }
    };

    KeyPair::import(&key.key_id, &key.public_jwk, &key.private_jwk, &key.issuer_did)
        .map_err(|e| server!("Failed to import issuer key: {e}"))
}
