//! # Metadata Endpoints
//!
//! The issuer's discovery surface: OpenID configuration, credential-issuer
//! metadata, the `did:web` DID document, and the published PID JSON
//! Schema. These documents are static-shaped; only the DID document reads
//! the store (for the active issuer key).

use anyhow::Context as _;
use eudi_vdc::{DidDocument, Jwk, verifier_key_pair};
use serde_json::{Value, json};

use crate::handlers::{Handler, Request, Response};
use crate::provider::{IssuerKeyStore, Provider};
use crate::types::{DidRequest, DidResponse, MetadataRequest, MetadataResponse, SchemaRequest};
use crate::{Error, Result};

/// OpenID configuration handler (`/.well-known/openid-configuration`).
fn openid_configuration(issuer: &str) -> Value {
    json!({
        "credential_issuer": issuer,
        "credential_endpoint": format!("{issuer}/issue/credential"),
        "authorization_endpoint": format!("{issuer}/issue/authorize"),
        "token_endpoint": format!("{issuer}/issue/token"),
        "credential_configurations_supported": {
            eudi_vdc::PID_CREDENTIAL_TYPE: {
                "format": "jwt_vc",
                "doctype": eudi_vdc::PID_CREDENTIAL_TYPE,
                "scope": eudi_vdc::PID_CREDENTIAL_TYPE,
                "cryptographic_binding_methods_supported": ["jwk"],
                "credential_signing_alg_values_supported": ["ES256", "ES384", "ES512"],
                "proof_types_supported": {
                    "jwt": {
                        "proof_signing_alg_values_supported": ["ES256", "ES384", "ES512"]
                    }
                },
                "order": ["given_name", "family_name", "birth_date", "issuing_country"],
                "claims": {
                    "given_name": {"mandatory": true, "value_type": "string",
                        "display": [{"name": "Given Name", "locale": "en-US"}]},
                    "family_name": {"mandatory": true, "value_type": "string",
                        "display": [{"name": "Family Name", "locale": "en-US"}]},
                    "birth_date": {"mandatory": true, "value_type": "string",
                        "display": [{"name": "Date of Birth", "locale": "en-US"}]},
                    "issuing_country": {"mandatory": true, "value_type": "string",
                        "display": [{"name": "Issuing Country", "locale": "en-US"}]}
                }
            }
        },
        "grant_types_supported": [
            "authorization_code",
            "urn:ietf:params:oauth:grant-type:pre-authorized_code"
        ],
        "pre_authorized_grant_anonymous_access_supported": true,
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none"],
        "response_types_supported": ["code"],
        "response_modes_supported": ["query"],
        "scopes_supported": [eudi_vdc::PID_CREDENTIAL_TYPE],
        "display": [{"name": "Digital Credentials Issuer", "locale": "en-US"}]
    })
}

/// Credential-issuer metadata handler
/// (`/.well-known/openid-credential-issuer`).
fn credential_issuer_metadata(issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "authorization_servers": [issuer],
        "credential_issuer": issuer,
        "credential_endpoint": format!("{issuer}/issue/credential"),
        "token_endpoint": format!("{issuer}/issue/token"),
        "authorization_endpoint": format!("{issuer}/issue/authorize"),
        "pre_authorized_grant_anonymous_access_supported": true,
        "display": [{"name": "Digital Credentials Issuer", "locale": "en-US"}],
        "credential_configurations_supported": {
            eudi_vdc::PID_CREDENTIAL_TYPE: {
                "format": "jwt_vc",
                "doctype": eudi_vdc::PID_CREDENTIAL_TYPE,
                "scope": eudi_vdc::PID_CREDENTIAL_TYPE,
                "cryptographic_binding_methods_supported": ["jwk", "did"],
                "credential_signing_alg_values_supported": ["ES256"],
                "proof_types_supported": {
                    "jwt": {
                        "proof_signing_alg_values_supported": ["ES256", "ES384", "ES512"]
                    },
                    "did": {
                        "proof_signing_alg_values_supported": ["ES256", "ES384", "ES512"]
                    }
                },
                "order": ["given_name", "family_name", "birth_date", "issuing_country"],
                "display": [{
                    "name": "Digital Credentials Issuer",
                    "locale": "en-US",
                    "logo": {"uri": format!("{issuer}/logo.png"), "alt_text": "EU Digital Identity"},
                    "background_color": "#003399",
                    "text_color": "#FFFFFF"
                }],
                "claims": {
                    eudi_vdc::PID_CREDENTIAL_TYPE: {
                        "given_name": {"mandatory": true,
                            "display": [{"name": "Given Name", "locale": "en-US"}]},
                        "family_name": {"mandatory": true,
                            "display": [{"name": "Family Name", "locale": "en-US"}]},
                        "birth_date": {"mandatory": true,
                            "display": [{"name": "Date of Birth", "locale": "en-US"}]},
                        "age_over_18": {"mandatory": false,
                            "display": [{"name": "Over 18", "locale": "en-US"}]},
                        "document_number": {"mandatory": false,
                            "display": [{"name": "Document Number", "locale": "en-US"}]},
                        "expiry_date": {"mandatory": false,
                            "display": [{"name": "Expiry Date", "locale": "en-US"}]},
                        "issuing_country": {"mandatory": false,
                            "display": [{"name": "Issuing Country", "locale": "en-US"}]}
                    }
                }
            }
        },
        "token_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": ["S256"],
        "grant_types_supported": [
            "authorization_code",
            "urn:ietf:params:oauth:grant-type:pre-authorized_code"
        ]
    })
}

/// The published PID JSON Schema (`/api/schemas/pid`).
fn pid_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://sr.oots.tech.ec.europa.eu/schemas/pid",
        "title": "PID",
        "description": "A VCDM v1.1 compliant, minimal implementation of the EUDI Wallet PID rulebook",
        "type": "object",
        "properties": {
            "@context": {
                "type": "array",
                "items": {"type": "string", "format": "uri"},
                "contains": {"const": "https://www.w3.org/2018/credentials/v1"},
                "minItems": 1,
                "uniqueItems": true
            },
            "type": {
                "type": "array",
                "items": {"type": "string"},
                "contains": {"type": "string", "const": eudi_vdc::PID_CREDENTIAL_TYPE},
                "uniqueItems": true
            },
            "issuer": {"type": "string"},
            "issuanceDate": {"type": "string", "format": "date-time"},
            "expirationDate": {"type": "string", "format": "date-time"},
            "credentialSubject": {
                "anyOf": [
                    {"$ref": "#/$defs/PID"},
                    {"type": "array", "items": {"$ref": "#/$defs/PID"}}
                ]
            },
            "credentialSchema": {"$ref": "#/$defs/credentialSchema"}
        },
        "required": ["@context", "type", "issuer", "credentialSubject"],
        "$defs": {
            "PID": {
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "givenName": {"type": "string"},
                    "familyName": {"type": "string"},
                    "birthDate": {"type": "string", "format": "date"},
                    "ageOver18": {"type": "string"},
                    "ageOver21": {"type": "string"},
                    "documentNumber": {"type": "string"},
                    "expiryDate": {"type": "string", "format": "date"},
                    "issueDate": {"type": "string", "format": "date"},
                    "issuingCountry": {"type": "string"},
                    "issuingAuthority": {"type": "string"}
                },
                "required": ["givenName", "familyName", "birthDate"]
            },
            "credentialSchema": {
                "type": "object",
                "properties": {
                    "id": {"type": "string", "format": "uri"},
                    "type": {"type": "string"}
                },
                "required": ["id", "type"]
            }
        }
    })
}

/// DID document handler (`/.well-known/did.json`). The issuer variant
/// requires an active issuer key; the verifier variant
/// (`?service=verifier`) publishes the process verifier key.
async fn did_document(
    issuer: &str, provider: &impl Provider, request: DidRequest,
) -> Result<DidResponse> {
    if request.service.as_deref() == Some("verifier") {
        let verifier_did = format!("{}:verifier", eudi_vdc::did_web(issuer));
        let pair = verifier_key_pair(&verifier_did)
            .map_err(|e| Error::ServerError(format!("Failed to get verifier key: {e}")))?;
        return Ok(DidResponse(DidDocument::for_verifier(issuer, pair.public_jwk.clone())));
    }

    let Some(key) = provider.get_active_key().await.context("fetching issuer key")? else {
        return Err(Error::NotFound("No active issuer key found".to_string()));
    };
    let public_jwk: Jwk =
        serde_json::from_str(&key.public_jwk).context("parsing issuer public JWK")?;

    Ok(DidResponse(DidDocument::for_issuer(issuer, &key.key_id, public_jwk)))
}

impl<P: Provider> Handler<MetadataResponse, P> for Request<MetadataRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, _provider: &P) -> Result<Response<MetadataResponse>> {
        Ok(MetadataResponse(openid_configuration(issuer)).into())
    }
}

/// Marker wrapper so the issuer-metadata document can share the
/// `MetadataRequest` body with the OpenID configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct IssuerMetadataRequest;

impl eudi_core::Body for IssuerMetadataRequest {}

impl<P: Provider> Handler<MetadataResponse, P> for Request<IssuerMetadataRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, _provider: &P) -> Result<Response<MetadataResponse>> {
        Ok(MetadataResponse(credential_issuer_metadata(issuer)).into())
    }
}

impl<P: Provider> Handler<MetadataResponse, P> for Request<SchemaRequest> {
    type Error = Error;

    async fn handle(self, _issuer: &str, _provider: &P) -> Result<Response<MetadataResponse>> {
        Ok(MetadataResponse(pid_schema()).into())
    }
}

impl<P: Provider> Handler<DidResponse, P> for Request<DidRequest> {
    type Error = Error;

    async fn handle(self, issuer: &str, provider: &P) -> Result<Response<DidResponse>> {
        Ok(did_document(issuer, provider, self.body).await?.into())
    }
}
