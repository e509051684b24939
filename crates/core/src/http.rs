//! # Axum Response
//!
//! Adapts handler results to HTTP responses, preserving each error's OAuth
//! error body and status code.

use http::{Response, StatusCode, header};
use serde::Serialize;

use crate::api;

/// Implemented by endpoint error enums so the HTTP layer can map a variant
/// to its status code while the serialized body carries the OAuth-style
/// `{error, error_description}` fields.
pub trait HttpError: Serialize {
    /// The HTTP status code to return for this error.
    fn status(&self) -> StatusCode;
}

/// Trait for converting a handler `Result` into an HTTP response.
pub trait IntoHttp {
    /// The body type of the HTTP response.
    type Body;

    /// Convert into an HTTP response.
    fn into_http(self) -> Response<Self::Body>;
}

impl<T: Serialize, E: HttpError> IntoHttp for Result<api::Response<T>, E> {
    type Body = axum::body::Body;

    fn into_http(self) -> Response<Self::Body> {
        let result = match self {
            Ok(r) => {
                let body = serde_json::to_vec(&r.body).unwrap_or_default();
                Response::builder()
                    .status(r.status)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Self::Body::from(body))
            }
            Err(e) => {
                let status = e.status();
                let body = serde_json::to_vec(&e).unwrap_or_default();
                Response::builder()
                    .status(status)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Self::Body::from(body))
            }
        };
        result.unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Self::Body::empty())
                .unwrap_or_default()
        })
    }
}
