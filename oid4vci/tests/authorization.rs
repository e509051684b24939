//! Authorization Code Flow (PKCE) Tests

use eudi_oid4vci::{AuthCodeRequest, Error, GrantType, TokenRequest, pkce};
use eudi_store::MemStore;

const ISSUER: &str = "http://localhost:3000";
const CLIENT: &str = "wallet-client";
const REDIRECT: &str = "https://wallet.example.com/cb";

fn auth_request(verifier: &str) -> AuthCodeRequest {
    AuthCodeRequest {
        response_type: Some("code".to_string()),
        client_id: Some(CLIENT.to_string()),
        redirect_uri: Some(REDIRECT.to_string()),
        state: Some("xyz".to_string()),
        code_challenge: Some(pkce::code_challenge(verifier)),
        code_challenge_method: Some("S256".to_string()),
        ..AuthCodeRequest::default()
    }
}

// Should issue a code by redirect and redeem it with the matching PKCE
// verifier.
#[tokio::test]
async fn code_with_pkce() {
    let provider = MemStore::new();
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    // --------------------------------------------------
    // The wallet starts the standard OAuth flow
    // --------------------------------------------------
    let response = eudi_oid4vci::handle(ISSUER, auth_request(verifier), &provider)
        .await
        .expect("should issue code");
    assert!(response.redirect_to.starts_with(&format!("{REDIRECT}?code=")));
    assert!(response.redirect_to.ends_with("&state=xyz"));

    // --------------------------------------------------
    // The wallet exchanges the code, proving possession of the verifier
    // --------------------------------------------------
    let request = TokenRequest {
        grant_type: GrantType::AuthorizationCode,
        code: Some(response.code.clone()),
        client_id: Some(CLIENT.to_string()),
        redirect_uri: Some(REDIRECT.to_string()),
        code_verifier: Some(verifier.to_string()),
        ..TokenRequest::default()
    };
    let token = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect("should redeem");

    assert_eq!(token.token_type, "Bearer");
    assert!(token.refresh_token.is_some(), "authorization_code grant returns a refresh token");
}

// Should reject a wrong client, wrong redirect URI, or failed PKCE proof.
#[tokio::test]
async fn redemption_validation() {
    let provider = MemStore::new();
    let verifier = "correct-horse-battery-staple-correct-horse";

    let base = TokenRequest {
        grant_type: GrantType::AuthorizationCode,
        client_id: Some(CLIENT.to_string()),
        redirect_uri: Some(REDIRECT.to_string()),
        code_verifier: Some(verifier.to_string()),
        ..TokenRequest::default()
    };

    // wrong client_id
    let response =
        eudi_oid4vci::handle(ISSUER, auth_request(verifier), &provider).await.expect("code");
    let request = TokenRequest {
        code: Some(response.code.clone()),
        client_id: Some("other-client".to_string()),
        ..base.clone()
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("wrong client");
    assert!(matches!(err, Error::InvalidClient(_)));

    // wrong redirect_uri
    let response =
        eudi_oid4vci::handle(ISSUER, auth_request(verifier), &provider).await.expect("code");
    let request = TokenRequest {
        code: Some(response.code.clone()),
        redirect_uri: Some("https://elsewhere.example.com/cb".to_string()),
        ..base.clone()
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("wrong redirect");
    assert!(matches!(err, Error::InvalidRequest(_)));

    // missing verifier when a challenge was stored
    let response =
        eudi_oid4vci::handle(ISSUER, auth_request(verifier), &provider).await.expect("code");
    let request = TokenRequest {
        code: Some(response.code.clone()),
        code_verifier: None,
        ..base.clone()
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("missing verifier");
    assert!(matches!(err, Error::InvalidRequest(_)));

    // verifier that does not hash to the stored challenge
    let response =
        eudi_oid4vci::handle(ISSUER, auth_request(verifier), &provider).await.expect("code");
    let request = TokenRequest {
        code: Some(response.code.clone()),
        code_verifier: Some("a-completely-different-verifier-value-here".to_string()),
        ..base
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("bad verifier");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

// Should refuse response types other than `code`.
#[tokio::test]
async fn unsupported_response_type() {
    let provider = MemStore::new();
    let request = AuthCodeRequest {
        response_type: Some("token".to_string()),
        client_id: Some(CLIENT.to_string()),
        redirect_uri: Some(REDIRECT.to_string()),
        ..AuthCodeRequest::default()
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("implicit flow");
    assert!(matches!(err, Error::UnsupportedResponseType(_)));
}
