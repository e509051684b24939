//! # PID Service
//!
//! A (naive) HTTP server exposing the OpenID4VCI issuance and
//! OpenID4VP/SIOPv2 verification endpoints against the in-memory artifact
//! store.

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::TypedHeader;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Host};
use eudi_core::IntoHttp;
use eudi_oid4vci::{
    AuthCodeRequest, AuthorizeRequest, CredentialRequest, DidRequest, IssuerMetadataRequest,
    MetadataRequest, SchemaRequest, TokenRequest, authorized,
};
use eudi_oid4vp::{
    CallbackRequest, CredentialByIdRequest, FinishRequest, JwksRequest, RequestObjectRequest,
    SessionCredentialsRequest, SiopStartRequest, StartRequest, StatusRequest,
};
use eudi_store::MemStore;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

const ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info,eudi=debug").init();

    let store = MemStore::new();

    let router = Router::new()
        // issuance
        .route("/issue/authorize", post(authorize).get(auth_code))
        .route("/issue/token", post(token))
        .route("/issue/credential", post(credential))
        // issuer discovery
        .route("/.well-known/openid-configuration", get(openid_configuration))
        .route("/.well-known/openid-credential-issuer", get(issuer_metadata))
        .route("/.well-known/did.json", get(did_document))
        .route("/api/schemas/pid", get(pid_schema))
        // verification
        .route("/verify/start", get(start))
        .route("/verify/finish", post(finish))
        .route("/verify/openid4vci/start", post(siop_start))
        .route("/verify/openid4vci/request/{session_id}", get(request_object))
        .route("/verify/openid4vci/callback", post(callback))
        .route("/verify/openid4vci/status/{session_id}", get(status))
        .route("/verify/openid4vci/jwks", get(jwks))
        .route("/verify/credential/{session_id}", get(session_credentials))
        .route("/verify/credential/id/{credential_id}", get(credential_by_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store"),
        ))
        .with_state(store);

    let listener = TcpListener::bind(ADDR).await?;
    tracing::info!("listening on {ADDR}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn base_url(host: &Host) -> String {
    format!("http://{host}")
}

// --- issuance -----------------------------------------------------------

async fn authorize(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Json(request): Json<AuthorizeRequest>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), request, &store).await.into_http()
}

// RFC 6749 authorization: the code is delivered by adding response
// parameters to the query component of the redirect URI.
async fn auth_code(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Query(request): Query<AuthCodeRequest>,
) -> axum::response::Response {
    match eudi_oid4vci::handle(&base_url(&host), request, &store).await {
        Ok(response) => Redirect::to(&response.redirect_to).into_response(),
        Err(e) => {
            let err: Result<eudi_core::Response<()>, _> = Err(e);
            err.into_http().into_response()
        }
    }
}

async fn token(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Form(request): Form<TokenRequest>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), request, &store).await.into_http()
}

async fn credential(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    auth: Option<TypedHeader<Authorization<Bearer>>>, Json(request): Json<CredentialRequest>,
) -> axum::response::Response {
    let Some(TypedHeader(auth)) = auth else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_token",
                "error_description": "Bearer token required"
            })),
        )
            .into_response();
    };
    eudi_oid4vci::handle(&base_url(&host), authorized(request, auth.token()), &store)
        .await
        .into_http()
        .into_response()
}

async fn openid_configuration(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), MetadataRequest, &store).await.into_http()
}

async fn issuer_metadata(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), IssuerMetadataRequest, &store).await.into_http()
}

async fn did_document(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Query(request): Query<DidRequest>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), request, &store).await.into_http()
}

async fn pid_schema(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
) -> impl IntoResponse {
    eudi_oid4vci::handle(&base_url(&host), SchemaRequest, &store).await.into_http()
}

// --- verification -------------------------------------------------------

async fn start(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Query(request): Query<StartRequest>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), request, &store).await.into_http()
}

async fn finish(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Json(request): Json<FinishRequest>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), request, &store).await.into_http()
}

async fn siop_start(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), SiopStartRequest, &store).await.into_http()
}

// The request object is a JWT and is served as text/plain.
async fn request_object(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Path(session_id): Path<String>,
) -> axum::response::Response {
    let request = RequestObjectRequest { id: session_id };
    match eudi_oid4vp::handle(&base_url(&host), request, &store).await {
        Ok(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            response.jwt.clone(),
        )
            .into_response(),
        Err(e) => {
            let err: Result<eudi_core::Response<()>, _> = Err(e);
            err.into_http().into_response()
        }
    }
}

async fn callback(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Form(request): Form<CallbackRequest>,
) -> axum::response::Response {
    match eudi_oid4vp::handle(&base_url(&host), request, &store).await {
        Ok(response) => Redirect::to(&response.redirect_to).into_response(),
        Err(e) => {
            let err: Result<eudi_core::Response<()>, _> = Err(e);
            err.into_http().into_response()
        }
    }
}

async fn status(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), StatusRequest { session_id }, &store).await.into_http()
}

async fn jwks(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), JwksRequest, &store).await.into_http()
}

async fn session_credentials(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), SessionCredentialsRequest { session_id }, &store)
        .await
        .into_http()
}

async fn credential_by_id(
    State(store): State<MemStore>, TypedHeader(host): TypedHeader<Host>,
    Path(credential_id): Path<String>,
) -> impl IntoResponse {
    eudi_oid4vp::handle(&base_url(&host), CredentialByIdRequest { credential_id }, &store)
        .await
        .into_http()
}
