//! # Core
//!
//! Shared plumbing for the issuance (`eudi-oid4vci`) and verification
//! (`eudi-oid4vp`) endpoint crates: the request/response API surface, the
//! axum adapter, and generation of the random artifacts used throughout the
//! protocol flows.

pub mod api;
pub mod generate;
pub mod http;
pub mod urlencode;

pub use self::api::{Body, Handler, Headers, NoHeaders, Request, Response};
pub use self::http::{HttpError, IntoHttp};
