//! Maps `ptero_core::Error` (and any unclassified failure) onto the HTTP
//! statuses named in §7, via the same `IntoResponse`-on-an-error-struct
//! idiom used for this service's other typed error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ptero_core::Error> for ApiError {
    fn from(err: ptero_core::Error) -> Self {
        use ptero_core::Error::*;
        let status = match &err {
            NonUniqueName(_) => StatusCode::CONFLICT,
            MissingInputs(_) => StatusCode::BAD_REQUEST,
            InvalidLinks(_) => StatusCode::BAD_REQUEST,
            NoSuchEntity { .. } => StatusCode::NOT_FOUND,
            UpdateError(_) => StatusCode::CONFLICT,
            UnknownIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Database/IO failures that never reached a typed `ptero_core::Error` —
/// always mapped to 500, the callback handler's "abort, let the engine
/// redeliver" path (§4.3 "Concurrency").
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unhandled internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        anyhow::Error::from(err).into()
    }
}
