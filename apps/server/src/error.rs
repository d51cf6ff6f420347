//! Error types for the API server.
//!
//! Every failure a handler can surface maps to the uniform response envelope
//! `{code, msg, data}`. The envelope is returned with HTTP 200 and a non-zero
//! `code`; only `code == 0` means success. Clients of this API switch on the
//! envelope code, not the HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Envelope code for the success path.
pub const CODE_SUCCESS: i64 = 0;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid login user")]
    InvalidIdentity,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid request param: {0}")]
    RequestParamInvalid(String),

    #[error("internal server error")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Envelope code for this error kind.
    pub fn code(&self) -> i64 {
        match self {
            Error::MissingToken => 2001,
            Error::InvalidToken(_) => 2002,
            Error::InvalidIdentity => 2003,
            Error::MalformedInput(_) => 3001,
            Error::RequestParamInvalid(_) => 3002,
            Error::Internal(_) | Error::Other(_) => 1000,
        }
    }

    /// Message placed in the envelope. Internal details are not leaked.
    pub fn envelope_msg(&self) -> String {
        match self {
            Error::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                "internal server error".to_string()
            }
            Error::Other(e) => {
                tracing::error!(error = %e, "internal error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// The envelope body for this error, without writing it anywhere.
    pub fn envelope(&self) -> serde_json::Value {
        json!({
            "code": self.code(),
            "msg": self.envelope_msg(),
            "data": {},
        })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Domain errors ride inside a 200 envelope; see module docs.
        (StatusCode::OK, Json(self.envelope())).into_response()
    }
}
