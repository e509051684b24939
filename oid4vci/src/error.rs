//! # `OpenID` Errors
//!
//! Errors for `OpenID` for Verifiable Credential Issuance. Variants
//! serialize directly to the OAuth-style `{error, error_description}` body
//! expected by wallets.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `OpenID` error codes for Verifiable Credential Issuance.
#[derive(Error, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "error", content = "error_description")]
pub enum Error {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, or is otherwise malformed.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// Required holder identity claims are missing from the request.
    #[error(r#"{{"error": "missing_user_data", "error_description": "{0}"}}"#)]
    MissingUserData(String),

    /// The authorization server does not support obtaining an authorization
    /// code using this method.
    #[error(r#"{{"error": "unsupported_response_type", "error_description": "{0}"}}"#)]
    UnsupportedResponseType(String),

    /// The authorization grant type is not supported.
    #[error(r#"{{"error": "unsupported_grant_type", "error_description": "{0}"}}"#)]
    UnsupportedGrantType(String),

    /// The provided authorization grant (code, transaction code, PKCE
    /// verifier) is invalid, expired, or already redeemed.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    InvalidGrant(String),

    /// Client authentication failed.
    #[error(r#"{{"error": "invalid_client", "error_description": "{0}"}}"#)]
    InvalidClient(String),

    /// The access token is missing, invalid, or expired.
    #[error(r#"{{"error": "invalid_token", "error_description": "{0}"}}"#)]
    InvalidToken(String),

    /// The requested credential format is not supported.
    #[error(r#"{{"error": "unsupported_credential_format", "error_description": "{0}"}}"#)]
    UnsupportedCredentialFormat(String),

    /// The requested credential type is not supported.
    #[error(r#"{{"error": "unsupported_credential_type", "error_description": "{0}"}}"#)]
    UnsupportedCredentialType(String),

    /// The requested resource was not found.
    #[error(r#"{{"error": "not_found", "error_description": "{0}"}}"#)]
    NotFound(String),

    /// The server encountered an unexpected condition that prevented it
    /// from fulfilling the request.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl Error {
    /// The HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl eudi_core::HttpError for Error {
    fn status(&self) -> StatusCode {
        Self::status(self)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(error) => error.clone(),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

/// Construct an `Error::InvalidRequest` error from a string or existing
/// error value.
macro_rules! invalid {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::InvalidRequest(format!($err))
    };
}
pub(crate) use invalid;

/// Construct an `Error::ServerError` error from a string or existing error
/// value.
macro_rules! server {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::ServerError(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::ServerError(format!($err))
    };
}
pub(crate) use server;

#[cfg(test)]
mod test {
    use anyhow::{Context, Result, anyhow};
    use serde_json::{Value, json};

    use super::*;

    // Test that error details are returned as json.
    #[test]
    fn err_json() {
        let err = Error::InvalidGrant("Invalid or expired authorization code".to_string());
        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(
            ser,
            json!({
                "error": "invalid_grant",
                "error_description": "Invalid or expired authorization code"
            })
        );
    }

    // An anyhow error converts to a server_error with its context chain.
    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            r#"{"error": "server_error", "error_description": "error context -> one-off error"}"#
        );
    }

    // A wrapped protocol error survives the anyhow round trip.
    #[test]
    fn downcast_preserved() {
        let result: Result<Value, anyhow::Error> =
            Err(Error::UnsupportedGrantType("Unsupported grant type".to_string()).into());
        let err: Error = result.unwrap_err().into();

        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(ser["error"], "unsupported_grant_type");
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::InvalidToken(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::InvalidGrant(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::ServerError(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
