use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use skillswap_store::StoreError;

use crate::gatekeeper::AdmitError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Admission(#[from] AdmitError),

    #[error("Too many connection attempts, try again later")]
    TooManyRequests,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Admission(reject) => {
                let status = match reject {
                    AdmitError::IdentityBlocked => StatusCode::FORBIDDEN,
                    _ => StatusCode::UNAUTHORIZED,
                };
                let body = serde_json::json!({
                    "error": self.to_string(),
                    "reason": reject.reason(),
                });
                (status, axum::Json(body)).into_response()
            }
            RelayError::TooManyRequests => {
                let body = serde_json::json!({ "error": self.to_string() });
                (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response()
            }
            RelayError::Store(_) => {
                let body = serde_json::json!({ "error": "Internal server error" });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
        }
    }
}
