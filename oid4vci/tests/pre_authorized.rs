//! Pre-Authorized Code Flow Tests

use eudi_oid4vci::{
    AuthorizeRequest, CredentialRequest, Error, GrantType, Proof, TokenRequest, authorized,
};
use eudi_store::{IssuerKeyStore, MemStore};
use eudi_vdc::w3c_vc::{self, PidClaims};
use eudi_vdc::{CredentialFormat, Jwk};

const ISSUER: &str = "http://localhost:3000";

fn ada() -> PidClaims {
    PidClaims {
        given_name: "Ada".to_string(),
        family_name: "Lovelace".to_string(),
        birth_date: "1815-12-10".to_string(),
        ..PidClaims::default()
    }
}

// Should walk the whole pre-authorized flow: offer -> token -> credential.
#[tokio::test]
async fn offer_token_credential() {
    let provider = MemStore::new();

    // --------------------------------------------------
    // The holder submits identity claims and receives an offer
    // --------------------------------------------------
    let request = AuthorizeRequest {
        user_data: Some(ada()),
    };
    let offer = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect("should create offer");

    assert!(!offer.pre_authorized_code.is_empty());
    assert_eq!(offer.tx_code.len(), 4);
    assert!(offer.tx_code.parse::<u32>().is_ok());
    assert!(offer.credential_offer_uri.starts_with("openid-credential-offer://"));
    assert_eq!(offer.expires_in, 600);

    let grant = &offer.credential_offer.grants.pre_authorized_code;
    assert_eq!(grant.pre_authorized_code, offer.pre_authorized_code);
    assert!(grant.user_pin_required);

    // --------------------------------------------------
    // The wallet redeems the code with the transaction code as its PIN
    // --------------------------------------------------
    let request = TokenRequest {
        grant_type: GrantType::PreAuthorizedCode,
        pre_authorized_code: Some(offer.pre_authorized_code.clone()),
        user_pin: Some(offer.tx_code.clone()),
        ..TokenRequest::default()
    };
    let token = eudi_oid4vci::handle(ISSUER, request.clone(), &provider)
        .await
        .expect("should return token");

    assert!(!token.access_token.is_empty());
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);
    assert!(!token.c_nonce.is_empty());
    assert_eq!(token.c_nonce_expires_in, 300);
    assert!(token.refresh_token.is_none(), "pre-authorized grant has no refresh token");

    // a second redemption of the same code must fail
    let replay = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("single use");
    assert!(matches!(replay, Error::InvalidGrant(_)));

    // --------------------------------------------------
    // The wallet requests the credential with its bearer token
    // --------------------------------------------------
    let request = CredentialRequest {
        format: Some(CredentialFormat::JwtVc),
        credential_type: Some("eu.europa.ec.eudi.pid.1".to_string()),
        proof: Some(Proof {
            proof_type: Some("jwt".to_string()),
            jwt: Some("holder-proof".to_string()),
        }),
    };
    let response = eudi_oid4vci::handle(ISSUER, authorized(request, &token.access_token), &provider)
        .await
        .expect("should issue credential");

    assert_eq!(response.format, CredentialFormat::JwtVc);
    assert_eq!(response.credential.split('.').count(), 3);
    assert_ne!(response.c_nonce, token.c_nonce, "c_nonce rotates after issuance");

    // --------------------------------------------------
    // The credential verifies against the issuer's published key
    // --------------------------------------------------
    let key = provider.get_active_key().await.unwrap().expect("lazily provisioned key");
    let public_jwk: Jwk = serde_json::from_str(&key.public_jwk).unwrap();

    let result = w3c_vc::verify(&response.credential, &public_jwk);
    assert!(result.is_valid, "unexpected error: {:?}", result.error);

    let payload = result.payload.unwrap();
    assert_eq!(payload.iss, "did:web:localhost");
    assert_eq!(payload.sub, "did:jwt:holder-proof");
    assert_eq!(payload.vc.credential_subject.given_name, "Ada");
    assert_eq!(payload.vc.credential_subject.family_name, "Lovelace");
    // non-supplied claims fall back to the issuer defaults
    assert_eq!(payload.vc.credential_subject.document_number.as_deref(), Some("123456789"));
    assert_eq!(payload.vc.credential_subject.expiry_date.as_deref(), Some("2030-12-31"));
}

// Should reject a correct code presented with the wrong PIN.
#[tokio::test]
async fn wrong_transaction_code() {
    let provider = MemStore::new();

    let request = AuthorizeRequest {
        user_data: Some(ada()),
    };
    let offer = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect("should create offer");

    let wrong_pin = if offer.tx_code == "1000" { "1001" } else { "1000" };
    let request = TokenRequest {
        grant_type: GrantType::PreAuthorizedCode,
        pre_authorized_code: Some(offer.pre_authorized_code.clone()),
        user_pin: Some(wrong_pin.to_string()),
        ..TokenRequest::default()
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("wrong PIN");

    let Error::InvalidGrant(description) = err else {
        panic!("expected invalid_grant, got {err}");
    };
    assert!(description.contains("Invalid transaction code"));

    // the failed attempt must not consume the code
    let request = TokenRequest {
        grant_type: GrantType::PreAuthorizedCode,
        pre_authorized_code: Some(offer.pre_authorized_code.clone()),
        user_pin: Some(offer.tx_code.clone()),
        ..TokenRequest::default()
    };
    eudi_oid4vci::handle(ISSUER, request, &provider).await.expect("correct PIN still redeems");
}

// Should reject offers with incomplete identity claims.
#[tokio::test]
async fn missing_user_data() {
    let provider = MemStore::new();

    let err = eudi_oid4vci::handle(ISSUER, AuthorizeRequest { user_data: None }, &provider)
        .await
        .expect_err("no user data");
    assert!(matches!(err, Error::MissingUserData(_)));

    let request = AuthorizeRequest {
        user_data: Some(PidClaims {
            given_name: "Ada".to_string(),
            ..PidClaims::default()
        }),
    };
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("partial claims");
    assert!(matches!(err, Error::MissingUserData(_)));
}

// Should reject unknown grants, formats, types, and tokens.
#[tokio::test]
async fn unsupported_requests() {
    let provider = MemStore::new();

    // unknown grant type (e.g. client_credentials)
    let request: TokenRequest = serde_urlencoded::from_str(
        "grant_type=client_credentials&pre-authorized_code=abc",
    )
    .expect("should deserialize");
    let err = eudi_oid4vci::handle(ISSUER, request, &provider).await.expect_err("unknown grant");
    assert!(matches!(err, Error::UnsupportedGrantType(_)));

    // invalid bearer token
    let request = CredentialRequest {
        format: Some(CredentialFormat::JwtVc),
        ..CredentialRequest::default()
    };
    let err = eudi_oid4vci::handle(ISSUER, authorized(request, "not-a-token"), &provider)
        .await
        .expect_err("bad token");
    assert!(matches!(err, Error::InvalidToken(_)));

    // a real session, but an unsupported format / type
    let offer = eudi_oid4vci::handle(
        ISSUER,
        AuthorizeRequest {
            user_data: Some(ada()),
        },
        &provider,
    )
    .await
    .expect("offer");
    let token = eudi_oid4vci::handle(
        ISSUER,
        TokenRequest {
            grant_type: GrantType::PreAuthorizedCode,
            pre_authorized_code: Some(offer.pre_authorized_code.clone()),
            user_pin: Some(offer.tx_code.clone()),
            ..TokenRequest::default()
        },
        &provider,
    )
    .await
    .expect("token");

    let request = CredentialRequest {
        format: Some(CredentialFormat::MsoMdoc),
        ..CredentialRequest::default()
    };
    let err = eudi_oid4vci::handle(ISSUER, authorized(request, &token.access_token), &provider)
        .await
        .expect_err("mdoc is not mintable");
    assert!(matches!(err, Error::UnsupportedCredentialFormat(_)));

    let request = CredentialRequest {
        format: Some(CredentialFormat::JwtVc),
        credential_type: Some("org.iso.18013.5.1.mDL".to_string()),
        ..CredentialRequest::default()
    };
    let err = eudi_oid4vci::handle(ISSUER, authorized(request, &token.access_token), &provider)
        .await
        .expect_err("unsupported type");
    assert!(matches!(err, Error::UnsupportedCredentialType(_)));
}

// The token request round-trips the OpenID4VCI wire names (hyphenated code
// parameter, URN grant type).
#[test]
fn token_request_wire_names() {
    let form = "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Apre-authorized_code\
                &pre-authorized_code=abc123&user_pin=9999";
    let request: TokenRequest = serde_urlencoded::from_str(form).expect("should deserialize");

    assert_eq!(request.grant_type, GrantType::PreAuthorizedCode);
    assert_eq!(request.pre_authorized_code.as_deref(), Some("abc123"));
    assert_eq!(request.user_pin.as_deref(), Some("9999"));
}
