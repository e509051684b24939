//! # DID Documents
//!
//! `did:web` derivation from the service base URL and construction of the
//! DID documents published at `/.well-known/did.json` for the issuer and
//! verifier identities.

use serde::{Deserialize, Serialize};

use crate::keys::Jwk;

/// Derive the `did:web` identifier for a service base URL. The DID method
/// uses the hostname only; scheme, port, and path are dropped.
#[must_use]
pub fn did_web(base_url: &str) -> String {
    let host = base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or_default();
    let hostname = host.split(':').next().unwrap_or_default();
    format!("did:web:{hostname}")
}

/// A published verification method (key reference) within a DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VerificationMethod {
    /// Method identifier (`<did>#<kid>`).
    pub id: String,

    /// Method type (`JsonWebKey2020`).
    #[serde(rename = "type")]
    pub type_: String,

    /// Controlling DID.
    pub controller: String,

    /// The public key.
    #[serde(rename = "publicKeyJwk")]
    pub public_key_jwk: Jwk,
}

/// A service endpoint advertised by a DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Service {
    /// Service identifier.
    pub id: String,

    /// Service type.
    #[serde(rename = "type")]
    pub type_: String,

    /// Endpoint URL.
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

/// A `did:web` DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DidDocument {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// The DID.
    pub id: String,

    /// Controlling DID.
    pub controller: String,

    /// Published keys.
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,

    /// Keys usable for authentication.
    pub authentication: Vec<String>,

    /// Keys usable for assertions (credential signatures).
    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,

    /// Key-agreement keys (none published).
    #[serde(rename = "keyAgreement", skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<String>>,

    /// Capability-invocation keys (none published).
    #[serde(rename = "capabilityInvocation", skip_serializing_if = "Option::is_none")]
    pub capability_invocation: Option<Vec<String>>,

    /// Capability-delegation keys (none published).
    #[serde(rename = "capabilityDelegation", skip_serializing_if = "Option::is_none")]
    pub capability_delegation: Option<Vec<String>>,

    /// Advertised service endpoints.
    pub service: Vec<Service>,
}

impl DidDocument {
    /// The issuer DID document, advertising the active issuer key and the
    /// credential-issuer metadata endpoint.
    #[must_use]
    pub fn for_issuer(base_url: &str, key_id: &str, public_key_jwk: Jwk) -> Self {
        let did = did_web(base_url);
        let method_id = format!("{did}#{key_id}");
        Self {
            context: contexts(),
            id: did.clone(),
            controller: did.clone(),
            verification_method: vec![VerificationMethod {
                id: method_id.clone(),
                type_: "JsonWebKey2020".to_string(),
                controller: did.clone(),
                public_key_jwk,
            }],
            authentication: vec![method_id.clone()],
            assertion_method: vec![method_id],
            key_agreement: Some(vec![]),
            capability_invocation: Some(vec![]),
            capability_delegation: Some(vec![]),
            service: vec![Service {
                id: format!("{did}#openid-credential-issuer"),
                type_: "OpenIDCredentialIssuer".to_string(),
                service_endpoint: format!("{base_url}/.well-known/openid-credential-issuer"),
            }],
        }
    }

    /// The verifier DID document, advertising the process verifier key and
    /// the verification service endpoint.
    #[must_use]
    pub fn for_verifier(base_url: &str, public_key_jwk: Jwk) -> Self {
        let did = format!("{}:verifier", did_web(base_url));
        let method_id = format!("{did}#verifier-key-1");
        Self {
            context: contexts(),
            id: did.clone(),
            controller: did.clone(),
            verification_method: vec![VerificationMethod {
                id: method_id.clone(),
                type_: "JsonWebKey2020".to_string(),
                controller: did.clone(),
                public_key_jwk,
            }],
            authentication: vec![method_id.clone()],
            assertion_method: vec![method_id],
            key_agreement: None,
            capability_invocation: None,
            capability_delegation: None,
            service: vec![Service {
                id: format!("{did}#verifier-service"),
                type_: "VerifierService".to_string(),
                service_endpoint: format!("{base_url}/verify"),
            }],
        }
    }
}

fn contexts() -> Vec<String> {
    vec![
        "https://www.w3.org/ns/did/v1".to_string(),
        "https://w3id.org/security/suites/jws-2020/v1".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_web_strips_scheme_and_port() {
        assert_eq!(did_web("http://localhost:3000"), "did:web:localhost");
        assert_eq!(did_web("https://issuer.example.com/path"), "did:web:issuer.example.com");
    }

    #[test]
    fn issuer_document_shape() {
        let pair = crate::KeyPair::generate("issuer-key-1", "did:web:localhost").unwrap();
        let doc = DidDocument::for_issuer("http://localhost:3000", "issuer-key-1", pair.public_jwk);

        assert_eq!(doc.id, "did:web:localhost");
        assert_eq!(doc.verification_method[0].id, "did:web:localhost#issuer-key-1");
        assert_eq!(doc.authentication, vec!["did:web:localhost#issuer-key-1"]);
        assert_eq!(doc.service[0].type_, "OpenIDCredentialIssuer");
    }
}
