//! # Verifier Metadata Endpoint
//!
//! Publishes the verifier's JWKS so wallets that resolved the request
//! object by `jwks_uri` (rather than the embedded header JWK) can verify
//! its signature.

use eudi_vdc::{Jwks, did_web, verifier_key_pair};

use crate::handlers::{Handler, Request, Response};
use crate::provider::Provider;
use crate::types::{JwksRequest, JwksResponse};
use crate::{Error, Result};

fn jwks(verifier: &str) -> Result<JwksResponse> {
    let verifier_did = format!("{}:verifier", did_web(verifier));
    let pair = verifier_key_pair(&verifier_did)
        .map_err(|e| Error::ServerError(format!("Failed to get verifier key: {e}")))?;

    Ok(JwksResponse(Jwks {
        keys: vec![pair.public_jwk.clone()],
    }))
}

impl<P: Provider> Handler<JwksResponse, P> for Request<JwksRequest> {
    type Error = Error;

    async fn handle(self, verifier: &str, _provider: &P) -> Result<Response<JwksResponse>> {
        Ok(jwks(verifier)?.into())
    }
}
