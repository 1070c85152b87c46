use std::time::Duration;

use axum::{
    extract::rejection::BytesRejection,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Failures of the open action itself.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Only http/https URLs are permitted.")]
    SchemeNotAllowed,

    #[error("timed out after {0:?} waiting for 'open'")]
    Timeout(Duration),

    /// Non-zero exit; carries the child's stderr.
    #[error("{0}")]
    Failed(String),

    #[error("failed to launch 'open': {0}")]
    Spawn(#[from] std::io::Error),
}

/// Every non-success answer of the HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: Client IP not allowed")]
    Forbidden,

    #[error("Unauthorized: Bad token")]
    Unauthorized,

    #[error("Missing 'url'")]
    MissingUrl,

    #[error("Not Found")]
    NotFound,

    /// Body could not be read, e.g. over the size limit.
    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error(transparent)]
    Open(#[from] OpenError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MissingUrl => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Open(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({"ok": false, "error": self.to_string()})),
        )
            .into_response()
    }
}
