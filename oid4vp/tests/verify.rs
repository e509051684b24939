//! Presentation Verification Tests

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use eudi_oid4vci::{AuthorizeRequest, CredentialRequest, GrantType, TokenRequest, authorized};
use eudi_oid4vp::{
    CallbackRequest, CredentialByIdRequest, Error, FinishRequest, RequestObjectRequest,
    SessionCredentialsRequest, SiopStartRequest, StartRequest, StatusRequest,
};
use eudi_store::{IssuerKey, IssuerKeyStore, MemStore, VerificationStatus};
use eudi_vdc::w3c_vc::{PidClaims, VcBuilder};
use eudi_vdc::{CredentialFormat, KeyPair};
use serde_json::{Map, Value, json};

const VERIFIER: &str = "http://localhost:3000";

fn ada() -> PidClaims {
    PidClaims {
        given_name: "Ada".to_string(),
        family_name: "Lovelace".to_string(),
        birth_date: "1815-12-10".to_string(),
        ..PidClaims::default()
    }
}

// Issue a PID credential through the issuance flow so the issuer key is
// registered in the same store the verifier reads.
async fn issue_credential(provider: &MemStore) -> String {
    let offer = eudi_oid4vci::handle(
        VERIFIER,
        AuthorizeRequest {
            user_data: Some(ada()),
        },
        provider,
    )
    .await
    .expect("offer");

    let token = eudi_oid4vci::handle(
        VERIFIER,
        TokenRequest {
            grant_type: GrantType::PreAuthorizedCode,
            pre_authorized_code: Some(offer.pre_authorized_code.clone()),
            user_pin: Some(offer.tx_code.clone()),
            ..TokenRequest::default()
        },
        provider,
    )
    .await
    .expect("token");

    let request = CredentialRequest {
        format: Some(CredentialFormat::JwtVc),
        ..CredentialRequest::default()
    };
    eudi_oid4vci::handle(VERIFIER, authorized(request, &token.access_token), provider)
        .await
        .expect("credential")
        .credential
        .clone()
}

fn vp_token_map(credential: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("cred1".to_string(), Value::String(credential.to_string()));
    map
}

// Should verify a registered issuer's credential and refuse a replay of
// the same challenge.
#[tokio::test]
async fn verify_and_replay() {
    let provider = MemStore::new();
    let credential = issue_credential(&provider).await;

    // --------------------------------------------------
    // The verifier starts a presentation
    // --------------------------------------------------
    let start = eudi_oid4vp::handle(VERIFIER, StartRequest::default(), &provider)
        .await
        .expect("should start");
    assert_eq!(start.state.nonce, start.challenge);
    assert_eq!(start.dcql_query.credentials[0].id, "cred1");
    assert_eq!(start.dcql_query.credentials[0].format, CredentialFormat::JwtVc);

    // --------------------------------------------------
    // The wallet responds with the credential
    // --------------------------------------------------
    let request = FinishRequest {
        vp_token: Some(vp_token_map(&credential)),
        state: Some(start.state.clone()),
        ..FinishRequest::default()
    };
    let response =
        eudi_oid4vp::handle(VERIFIER, request.clone(), &provider).await.expect("should finish");

    assert!(response.verified);
    assert_eq!(response.status, http::StatusCode::OK);
    let details = response.details.as_ref().expect("details");
    assert_eq!(details["signature_verified"], json!(true));
    assert_eq!(details["issuer"], json!("did:web:localhost"));

    let session_id = response.session_id.clone().expect("session id");

    // --------------------------------------------------
    // The session is terminal and the credential recorded
    // --------------------------------------------------
    let status = eudi_oid4vp::handle(
        VERIFIER,
        StatusRequest {
            session_id: session_id.clone(),
        },
        &provider,
    )
    .await
    .expect("status");
    assert_eq!(status.body.status, VerificationStatus::Verified);

    let stored = eudi_oid4vp::handle(
        VERIFIER,
        SessionCredentialsRequest {
            session_id: session_id.clone(),
        },
        &provider,
    )
    .await
    .expect("stored credentials");
    assert_eq!(stored.count, 1);
    assert_eq!(stored.verified_credentials[0].credential_type, "eu.europa.ec.eudi.pid.1");
    assert_eq!(stored.verified_credentials[0].claims["givenName"], json!("Ada"));

    let by_id = eudi_oid4vp::handle(
        VERIFIER,
        CredentialByIdRequest {
            credential_id: stored.verified_credentials[0].id.clone(),
        },
        &provider,
    )
    .await
    .expect("by id");
    assert_eq!(by_id.verified_credential.session_id, session_id);

    // --------------------------------------------------
    // Replaying the consumed challenge must fail
    // --------------------------------------------------
    let replay = eudi_oid4vp::handle(VERIFIER, request, &provider).await.expect("response");
    assert_eq!(replay.status, http::StatusCode::BAD_REQUEST);
    assert!(!replay.verified);
    assert_eq!(replay.message, "Invalid or expired challenge.");
}

// A credential from an issuer with no registered key is accepted by the
// demo policy, with signature verification skipped and flagged.
#[tokio::test]
async fn unknown_issuer_fallback() {
    let provider = MemStore::new();

    let pair = KeyPair::generate("rogue-key", "did:web:unknown.example.com").unwrap();
    let credential = VcBuilder::new(&ada(), &pair)
        .subject_id("did:example:holder")
        .schema_uri("https://unknown.example.com/schema")
        .build()
        .unwrap();

    let start =
        eudi_oid4vp::handle(VERIFIER, StartRequest::default(), &provider).await.expect("start");
    let response = eudi_oid4vp::handle(
        VERIFIER,
        FinishRequest {
            vp_token: Some(vp_token_map(&credential)),
            state: Some(start.state.clone()),
            ..FinishRequest::default()
        },
        &provider,
    )
    .await
    .expect("finish");

    assert!(response.verified, "demo policy accepts unknown issuers");
    let details = response.details.as_ref().expect("details");
    assert_eq!(details["signature_verified"], json!(false));
}

// A tampered signature from a registered issuer fails and the session
// records the failure.
#[tokio::test]
async fn tampered_signature_fails() {
    let provider = MemStore::new();
    let credential = issue_credential(&provider).await;

    let mut parts: Vec<String> = credential.split('.').map(ToString::to_string).collect();
    let sig = parts[2].clone();
    let flipped = if sig.starts_with('A') { "B" } else { "A" };
    parts[2] = format!("{flipped}{}", &sig[1..]);
    let forged = parts.join(".");

    let start =
        eudi_oid4vp::handle(VERIFIER, StartRequest::default(), &provider).await.expect("start");
    let response = eudi_oid4vp::handle(
        VERIFIER,
        FinishRequest {
            vp_token: Some(vp_token_map(&forged)),
            state: Some(start.state.clone()),
            ..FinishRequest::default()
        },
        &provider,
    )
    .await
    .expect("finish");

    assert_eq!(response.status, http::StatusCode::BAD_REQUEST);
    assert!(!response.verified);

    let session_id = response.session_id.clone().expect("session id");
    let status = eudi_oid4vp::handle(VERIFIER, StatusRequest { session_id }, &provider)
        .await
        .expect("status");
    assert_eq!(status.body.status, VerificationStatus::Failed);
    assert!(status.error.as_ref().expect("error").contains("JWT verification failed"));
}

// An expired credential is rejected with the expiry-specific message.
#[tokio::test]
async fn expired_credential_fails() {
    let provider = MemStore::new();

    // register an issuer key, then present a credential signed by it with
    // an exp in the past
    let pair = KeyPair::generate("issuer-key-1", "did:web:localhost").unwrap();
    provider
        .create_key(IssuerKey {
            id: "k1".to_string(),
            key_id: pair.key_id.clone(),
            issuer_did: pair.issuer_did.clone(),
            key_type: "EC".to_string(),
            algorithm: pair.algorithm.clone(),
            public_jwk: serde_json::to_string(&pair.public_jwk).unwrap(),
            private_jwk: serde_json::to_string(&pair.private_jwk).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let header = Base64UrlUnpadded::encode_string(
        serde_json::to_string(&json!({"alg": "ES256", "typ": "JWT", "kid": "issuer-key-1"}))
            .unwrap()
            .as_bytes(),
    );
    let payload = Base64UrlUnpadded::encode_string(
        serde_json::to_string(&json!({
            "iss": "did:web:localhost",
            "sub": "did:example:holder",
            "iat": Utc::now().timestamp() - 600,
            "exp": Utc::now().timestamp() - 60,
            "vc": {"credentialSubject": {"givenName": "Ada"}}
        }))
        .unwrap()
        .as_bytes(),
    );
    let expired = format!("{header}.{payload}.AAAA");

    let start =
        eudi_oid4vp::handle(VERIFIER, StartRequest::default(), &provider).await.expect("start");
    let response = eudi_oid4vp::handle(
        VERIFIER,
        FinishRequest {
            vp_token: Some(vp_token_map(&expired)),
            state: Some(start.state.clone()),
            ..FinishRequest::default()
        },
        &provider,
    )
    .await
    .expect("finish");

    assert!(!response.verified);
    assert_eq!(response.message, "Credential has expired");
}

// Malformed finish requests fail before the store is touched, with
// diagnostics for a wrong credential id.
#[tokio::test]
async fn malformed_finish_requests() {
    let provider = MemStore::new();

    // no vp_token at all
    let err = eudi_oid4vp::handle(VERIFIER, FinishRequest::default(), &provider)
        .await
        .expect_err("no vp_token");
    assert!(matches!(err, Error::InvalidRequest(_)));

    // vp_token keyed by the wrong credential id lists the available ids
    let start =
        eudi_oid4vp::handle(VERIFIER, StartRequest::default(), &provider).await.expect("start");
    let mut map = Map::new();
    map.insert("other-cred".to_string(), Value::String("x.y.z".to_string()));
    let err = eudi_oid4vp::handle(
        VERIFIER,
        FinishRequest {
            vp_token: Some(map),
            state: Some(start.state.clone()),
            ..FinishRequest::default()
        },
        &provider,
    )
    .await
    .expect_err("wrong id");
    let Error::InvalidRequest(description) = err else {
        panic!("expected invalid_request");
    };
    assert!(description.contains("Available IDs: other-cred"));
}

// An mdoc presentation passes the structural pipeline without signature
// verification.
#[tokio::test]
async fn mdoc_structural_validation() {
    let provider = MemStore::new();

    let mut item = Vec::new();
    ciborium::ser::into_writer(
        &ciborium::Value::Map(vec![(
            ciborium::Value::Text("family_name".into()),
            ciborium::Value::Text("Lovelace".into()),
        )]),
        &mut item,
    )
    .unwrap();
    let root = ciborium::Value::Map(vec![(
        ciborium::Value::Text("documents".into()),
        ciborium::Value::Array(vec![ciborium::Value::Map(vec![(
            ciborium::Value::Text("issuerSigned".into()),
            ciborium::Value::Map(vec![(
                ciborium::Value::Text("nameSpaces".into()),
                ciborium::Value::Map(vec![(
                    ciborium::Value::Text("eu.europa.ec.eudi.pid.1".into()),
                    ciborium::Value::Array(vec![ciborium::Value::Tag(
                        24,
                        Box::new(ciborium::Value::Bytes(item)),
                    )]),
                )]),
            )]),
        )])]),
    )]);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&root, &mut bytes).unwrap();
    let encoded = Base64UrlUnpadded::encode_string(&bytes);

    let start = eudi_oid4vp::handle(
        VERIFIER,
        StartRequest {
            format: Some(CredentialFormat::MsoMdoc),
        },
        &provider,
    )
    .await
    .expect("start");
    assert_eq!(start.dcql_query.credentials[0].format, CredentialFormat::MsoMdoc);

    let response = eudi_oid4vp::handle(
        VERIFIER,
        FinishRequest {
            vp_token: Some(vp_token_map(&encoded)),
            data: None,
            state: Some(start.state.clone()),
            format: Some(CredentialFormat::MsoMdoc),
        },
        &provider,
    )
    .await
    .expect("finish");

    assert!(response.verified);
    let details = response.details.as_ref().expect("details");
    assert_eq!(details["signature_verified"], json!(false));
    assert_eq!(details["verification_method"], json!("structural_validation"));
}

// The SIOPv2 leg: start, fetch the signed request object, and complete via
// the form callback.
#[tokio::test]
async fn siop_request_object_and_callback() {
    let provider = MemStore::new();
    let credential = issue_credential(&provider).await;

    // --------------------------------------------------
    // Start a cross-device verification
    // --------------------------------------------------
    let siop =
        eudi_oid4vp::handle(VERIFIER, SiopStartRequest, &provider).await.expect("siop start");
    assert!(siop.verification_url.contains("request_uri="));

    // --------------------------------------------------
    // The wallet fetches the signed request object
    // --------------------------------------------------
    let response = eudi_oid4vp::handle(
        VERIFIER,
        RequestObjectRequest {
            id: siop.session_id.clone(),
        },
        &provider,
    )
    .await
    .expect("request object");

    let jwt = &response.jwt;
    assert_eq!(jwt.split('.').count(), 3);

    // the header embeds the verifier's public JWK
    let header: Value = serde_json::from_slice(
        &Base64UrlUnpadded::decode_vec(jwt.split('.').next().unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(header["alg"], json!("ES256"));
    assert_eq!(header["jwk"]["kty"], json!("EC"));
    assert!(header["kid"].as_str().unwrap().contains(":verifier#verifier-key-1"));

    let payload = eudi_vdc::w3c_vc::decode_unverified(jwt).unwrap();
    assert_eq!(payload["state"], json!(siop.session_id));
    assert_eq!(payload["response_mode"], json!("form_post"));
    assert_eq!(payload["exp"].as_i64().unwrap() - payload["iat"].as_i64().unwrap(), 300);
    assert!(
        !payload["vp_token"]["presentation_definition"]["input_descriptors"][0]["constraints"]
            ["fields"]
            .as_array()
            .unwrap()
            .is_empty()
    );

    // --------------------------------------------------
    // The wallet posts its VP to the callback
    // --------------------------------------------------
    let vp_payload = Base64UrlUnpadded::encode_string(
        serde_json::to_string(&json!({"vp": {"verifiableCredential": [credential]}}))
            .unwrap()
            .as_bytes(),
    );
    let vp_header = Base64UrlUnpadded::encode_string(
        serde_json::to_string(&json!({"alg": "ES256", "typ": "JWT"})).unwrap().as_bytes(),
    );
    let vp_jwt = format!("{vp_header}.{vp_payload}.AAAA");

    let callback = eudi_oid4vp::handle(
        VERIFIER,
        CallbackRequest {
            state: Some(siop.session_id.clone()),
            vp_token: Some(vp_jwt),
            id_token: Some("id-token".to_string()),
            ..CallbackRequest::default()
        },
        &provider,
    )
    .await
    .expect("callback");

    assert_eq!(
        callback.redirect_to,
        format!("{VERIFIER}/verify?success=true&sessionId={}", siop.session_id)
    );

    let status = eudi_oid4vp::handle(
        VERIFIER,
        StatusRequest {
            session_id: siop.session_id.clone(),
        },
        &provider,
    )
    .await
    .expect("status");
    assert_eq!(status.body.status, VerificationStatus::Verified);

    let stored = eudi_oid4vp::handle(
        VERIFIER,
        SessionCredentialsRequest {
            session_id: siop.session_id.clone(),
        },
        &provider,
    )
    .await
    .expect("stored");
    assert_eq!(stored.count, 1);
}

// A wallet error, a missing VP, and an unknown session all redirect to the
// result page with an error parameter.
#[tokio::test]
async fn callback_error_redirects() {
    let provider = MemStore::new();

    let callback = eudi_oid4vp::handle(
        VERIFIER,
        CallbackRequest {
            error: Some("access_denied".to_string()),
            error_description: Some("User declined".to_string()),
            ..CallbackRequest::default()
        },
        &provider,
    )
    .await
    .expect("wallet error");
    assert!(callback.redirect_to.contains("error=User%20declined"));

    let callback = eudi_oid4vp::handle(
        VERIFIER,
        CallbackRequest {
            state: Some("unknown-session".to_string()),
            vp_token: Some("a.b.c".to_string()),
            ..CallbackRequest::default()
        },
        &provider,
    )
    .await
    .expect("unknown session");
    assert!(callback.redirect_to.contains("error="));

    let err = eudi_oid4vp::handle(
        VERIFIER,
        StatusRequest {
            session_id: "unknown-session".to_string(),
        },
        &provider,
    )
    .await
    .expect_err("unknown session status");
    assert!(matches!(err, Error::NotFound(_)));
}
