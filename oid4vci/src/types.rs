//! # Types
//!
//! Request and response types for the issuance endpoints. Field names are
//! wire-exact: wallets depend on the OpenID4VCI parameter spelling,
//! including the `pre-authorized_code` hyphenation.

use eudi_core::Body;
use eudi_vdc::CredentialFormat;
use eudi_vdc::w3c_vc::PidClaims;
use serde::{Deserialize, Serialize};

/// OAuth 2.0 grant types supported by the token endpoint.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum GrantType {
    /// The standard authorization-code grant.
    #[serde(rename = "authorization_code")]
    AuthorizationCode,

    /// The OpenID4VCI pre-authorized-code grant.
    #[serde(rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code")]
    PreAuthorizedCode,

    /// Any grant this server does not support.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Request a credential offer for a previously authenticated holder.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AuthorizeRequest {
    /// Holder identity claims to bind into the offer. `given_name`,
    /// `family_name`, and `birth_date` are mandatory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<PidClaims>,
}

impl Body for AuthorizeRequest {}

/// A credential offer and the out-of-band material needed to redeem it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthorizeResponse {
    /// The offer object.
    pub credential_offer: CredentialOffer,

    /// The offer as an `openid-credential-offer://` URI with the offer JSON
    /// percent-encoded into the `credential_offer` query parameter.
    pub credential_offer_uri: String,

    /// The pre-authorized code embedded in the offer.
    pub pre_authorized_code: String,

    /// The transaction code (PIN) the holder must present at the token
    /// endpoint.
    pub tx_code: String,

    /// Offer lifetime in seconds.
    pub expires_in: i64,

    /// Data for a client-rendered QR code (the offer URI).
    pub qr_code_data: String,
}

/// A credential offer, as scanned or deep-linked into a wallet.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialOffer {
    /// The issuer's base URL.
    pub credential_issuer: String,

    /// Offered credential configuration identifiers.
    pub credential_configuration_ids: Vec<String>,

    /// Grants the offer can be redeemed with.
    pub grants: Grants,

    /// Formats the issuer can mint, with accepted algorithms.
    pub supported_formats: SupportedFormats,
}

/// Grants embedded in a credential offer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Grants {
    /// The pre-authorized-code grant.
    #[serde(rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code")]
    pub pre_authorized_code: PreAuthorizedCodeGrant,
}

/// The pre-authorized-code grant parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PreAuthorizedCodeGrant {
    /// The code itself.
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,

    /// Whether the holder must supply a PIN at the token endpoint.
    pub user_pin_required: bool,

    /// The transaction code bound to this offer.
    pub tx_code: String,
}

/// Credential formats advertised in an offer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SupportedFormats {
    /// VC-JWT issuance parameters.
    pub jwt_vc: FormatAlgorithms,
}

/// Signature algorithms accepted for a format.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FormatAlgorithms {
    /// JOSE algorithm identifiers.
    pub alg: Vec<String>,
}

/// The standard OAuth authorization request (GET query parameters).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthCodeRequest {
    /// Must be `code`.
    pub response_type: Option<String>,

    /// The requesting client.
    pub client_id: Option<String>,

    /// Requested scope; defaults to the PID credential type.
    pub scope: Option<String>,

    /// Redirect target for the issued code.
    pub redirect_uri: Option<String>,

    /// Opaque client state, echoed on the redirect.
    pub state: Option<String>,

    /// PKCE code challenge.
    pub code_challenge: Option<String>,

    /// PKCE code challenge method (`S256`).
    pub code_challenge_method: Option<String>,
}

impl Body for AuthCodeRequest {}

/// The issued authorization code and the redirect that delivers it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthCodeResponse {
    /// The authorization code.
    pub code: String,

    /// Echoed client state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// The fully composed redirect target
    /// (`<redirect_uri>?code=...&state=...`).
    pub redirect_to: String,
}

/// The token endpoint request (form-encoded).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenRequest {
    /// The grant being redeemed.
    pub grant_type: GrantType,

    /// The pre-authorized code (wire name is hyphenated).
    #[serde(rename = "pre-authorized_code", skip_serializing_if = "Option::is_none")]
    pub pre_authorized_code: Option<String>,

    /// The authorization code, for the standard grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// The redeeming client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Must match the redirect URI the code was issued against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,

    /// Transaction code (PIN) for the pre-authorized grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_pin: Option<String>,
}

impl Body for TokenRequest {}

/// The token endpoint response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Bearer token for the credential endpoint.
    pub access_token: String,

    /// Always `Bearer`.
    pub token_type: String,

    /// Access-token lifetime in seconds.
    pub expires_in: i64,

    /// Nonce the wallet must include in its credential-request proof.
    pub c_nonce: String,

    /// `c_nonce` lifetime in seconds.
    pub c_nonce_expires_in: i64,

    /// Refresh token; only issued on the authorization-code grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// The credential endpoint request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialRequest {
    /// Requested credential format; only `jwt_vc` is supported.
    pub format: Option<CredentialFormat>,

    /// Requested credential type; defaults to the PID type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,

    /// The wallet's proof of possession of its key material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Body for CredentialRequest {}

/// A wallet proof of possession.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Proof {
    /// Proof type (`jwt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<String>,

    /// The proof JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

/// The credential endpoint response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialResponse {
    /// Format of the issued credential.
    pub format: CredentialFormat,

    /// The signed credential.
    pub credential: String,

    /// Rotated nonce for a subsequent credential request.
    pub c_nonce: String,

    /// `c_nonce` lifetime in seconds.
    pub c_nonce_expires_in: i64,
}

/// Request for the issuer discovery documents.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct MetadataRequest;

impl Body for MetadataRequest {}

/// A discovery document (static-shaped JSON).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MetadataResponse(pub serde_json::Value);

/// The issuer or verifier DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DidResponse(pub eudi_vdc::DidDocument);

/// Request for the published PID JSON Schema.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct SchemaRequest;

impl Body for SchemaRequest {}

/// Request for the `did:web` DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DidRequest {
    /// `verifier` selects the verifier identity; absent selects the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Body for DidRequest {}
