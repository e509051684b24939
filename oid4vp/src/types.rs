//! # Types
//!
//! Request and response types for the verification endpoints, the DCQL
//! query subset the verifier emits, and the SIOPv2 request-object claims.

use chrono::{DateTime, Utc};
use eudi_core::Body;
use eudi_store::{VerificationStatus, VerifiedCredential};
use eudi_vdc::CredentialFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Correlation state a wallet carries through a presentation and returns
/// with its response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StateParam {
    /// The credential type being requested.
    pub credential_type: String,

    /// The challenge value; doubles as the presentation nonce.
    pub nonce: String,

    /// The challenge row id.
    pub challenge_id: String,
}

/// Start a same-device presentation (GET `/verify/start`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StartRequest {
    /// Credential format to request; defaults to `jwt_vc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,
}

impl Body for StartRequest {}

/// The presentation request returned by start: a fresh challenge plus both
/// query dialects (DCQL for the Digital Credentials API, a legacy static
/// presentation definition for older wallets).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StartResponse {
    /// The challenge value.
    pub challenge: String,

    /// Correlation state to echo back on finish.
    pub state: StateParam,

    /// DCQL query for the requested claims.
    pub dcql_query: DcqlQuery,

    /// Legacy presentation definition.
    #[serde(rename = "presentationDefinition")]
    pub presentation_definition: PresentationDefinition,
}

/// DCQL query for requesting Verifiable Presentations.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DcqlQuery {
    /// Identifies requested credentials.
    pub credentials: Vec<CredentialQuery>,
}

/// A request for the presentation of a single credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialQuery {
    /// Identifies the credential in the response.
    pub id: String,

    /// The format of the requested credential.
    pub format: CredentialFormat,

    /// Format-specific metadata constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetadataQuery>,

    /// Claims requested from the credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<ClaimQuery>>,
}

/// Format-specific metadata constraints for a credential query.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MetadataQuery {
    /// mdoc doctype the credential must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctype_value: Option<String>,

    /// Acceptable credential type chains (W3C formats).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_values: Option<Vec<Vec<String>>>,
}

/// A claims path pointer within a requested credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClaimQuery {
    /// Path to the claim.
    pub path: Vec<String>,
}

/// A DIF presentation definition (legacy query dialect).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationDefinition {
    /// Definition identifier.
    pub id: String,

    /// Requested inputs.
    pub input_descriptors: Vec<InputDescriptor>,
}

/// A single requested credential within a presentation definition.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputDescriptor {
    /// Descriptor identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Why the verifier requests this credential.
    pub purpose: String,

    /// Field constraints the credential must satisfy.
    pub constraints: Constraints,

    /// Accepted formats with their signature algorithms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
}

/// Constraint set of an input descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constraints {
    /// Required fields.
    pub fields: Vec<FieldConstraint>,
}

/// A single required field within a credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FieldConstraint {
    /// JSONPath selectors for the field.
    pub path: Vec<String>,

    /// JSON Schema filter the value must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    /// Why the field is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// Start a SIOPv2 cross-device presentation
/// (POST `/verify/openid4vci/start`).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct SiopStartRequest;

impl Body for SiopStartRequest {}

/// The SIOPv2 verification session handle.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SiopStartResponse {
    /// Session identifier (also the `state` of the flow).
    #[serde(rename = "sessionId")]
    pub session_id: String,

    /// URL the wallet opens to begin the presentation.
    #[serde(rename = "verificationUrl")]
    pub verification_url: String,

    /// The challenge value.
    pub challenge: String,

    /// Challenge expiry.
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

/// Fetch the signed request object for a session
/// (GET `/verify/openid4vci/request/{session_id}`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RequestObjectRequest {
    /// The session identifier.
    pub id: String,
}

impl Body for RequestObjectRequest {}

/// The signed SIOPv2 request object, served as `text/plain`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RequestObjectResponse {
    /// The request-object JWT.
    pub jwt: String,
}

/// Claims of the signed SIOPv2 request object.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RequestObjectClaims {
    /// The verifier's client identifier.
    pub client_id: String,

    /// Token issuer (the verifier).
    pub iss: String,

    /// Audience (the verifier's DID).
    pub aud: String,

    /// Issued-at, seconds since epoch.
    pub iat: i64,

    /// Expiry, seconds since epoch.
    pub exp: i64,

    /// The session's challenge reference, echoed by the wallet.
    pub nonce: String,

    /// `id_token` for SIOPv2.
    pub response_type: String,

    /// `openid`.
    pub scope: String,

    /// SIOPv2 version indicator.
    pub version: String,

    /// SIOPv2 version indicator.
    pub siop_version: String,

    /// The session identifier.
    pub state: String,

    /// `form_post`.
    pub response_mode: String,

    /// Callback the wallet posts its response to.
    pub response_uri: String,

    /// The presentation request.
    pub vp_token: VpTokenRequest,

    /// Verifier registration metadata (JWKS URI, display, formats).
    pub registration: Value,
}

/// The `vp_token` member of a request object.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct VpTokenRequest {
    /// Constraints on the requested presentation.
    pub presentation_definition: PresentationDefinition,
}

/// Complete a same-device presentation (POST `/verify/finish`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FinishRequest {
    /// Map of credential query id to presented credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<Map<String, Value>>,

    /// Alternate envelope some wallets use (`data.vp_token`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FinishData>,

    /// The correlation state from start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateParam>,

    /// Format of the presented credential; defaults to `jwt_vc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,
}

impl Body for FinishRequest {}

/// Alternate `data` envelope of a finish request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FinishData {
    /// Map of credential query id to presented credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<Map<String, Value>>,
}

/// Outcome of a finish request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FinishResponse {
    /// Whether the presentation verified.
    pub verified: bool,

    /// Human-readable outcome.
    pub message: String,

    /// The verification session, when one was established.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Verification details for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    /// The extracted credential data.
    #[serde(rename = "credentialData", skip_serializing_if = "Option::is_none")]
    pub credential_data: Option<Value>,
}

impl FinishResponse {
    /// A failure outcome carrying only a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            session_id: None,
            details: None,
            credential_data: None,
        }
    }
}

/// The SIOPv2 callback (form-encoded POST
/// `/verify/openid4vci/callback`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CallbackRequest {
    /// The session identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// The presented VP JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<String>,

    /// The wallet's self-issued ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Error code, when the wallet declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error description, when the wallet declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl Body for CallbackRequest {}

/// Where the callback sends the holder's user agent.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallbackResponse {
    /// The UI result page, with success or error query parameters.
    pub redirect_to: String,
}

/// Poll a session's status
/// (GET `/verify/openid4vci/status/{session_id}`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StatusRequest {
    /// The session identifier.
    pub session_id: String,
}

impl Body for StatusRequest {}

/// A session's current status and attached outcome.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    /// The session identifier.
    #[serde(rename = "sessionId")]
    pub session_id: String,

    /// Current lifecycle status.
    pub status: VerificationStatus,

    /// Attached result payload, when terminal.
    #[serde(rename = "credentialData", skip_serializing_if = "Option::is_none")]
    pub credential_data: Option<Value>,

    /// Failure description, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Session creation time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Last session mutation time.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Fetch the verified credentials recorded for a session
/// (GET `/verify/credential/{session_id}`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SessionCredentialsRequest {
    /// The session identifier.
    pub session_id: String,
}

impl Body for SessionCredentialsRequest {}

/// Verified credentials recorded for a session.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionCredentialsResponse {
    /// The session identifier.
    #[serde(rename = "sessionId")]
    pub session_id: String,

    /// The recorded credentials.
    #[serde(rename = "verifiedCredentials")]
    pub verified_credentials: Vec<VerifiedCredential>,

    /// Number of credentials recorded.
    pub count: usize,
}

/// Fetch a single verified credential
/// (GET `/verify/credential/id/{credential_id}`).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CredentialByIdRequest {
    /// The credential row id.
    pub credential_id: String,
}

impl Body for CredentialByIdRequest {}

/// A single verified credential record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialByIdResponse {
    /// The recorded credential.
    #[serde(rename = "verifiedCredential")]
    pub verified_credential: VerifiedCredential,
}

/// Fetch the verifier's JWKS (GET `/verify/openid4vci/jwks`).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct JwksRequest;

impl Body for JwksRequest {}

/// The verifier's JWK set.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JwksResponse(pub eudi_vdc::Jwks);
