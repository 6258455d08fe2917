use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::HeaderName},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// 409 with the current holder in X-WOPI-Lock; `current` is None when
    /// the file is unlocked and the protocol wants an empty header value.
    #[error("Lock Conflict")]
    LockConflict { current: Option<String> },

    #[error("Not Implemented: {0}")]
    Unsupported(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Never tell the caller why the token failed.
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::LockConflict { current } => {
                let header_value = current.unwrap_or_default();
                return (
                    StatusCode::CONFLICT,
                    [(
                        HeaderName::from_static("x-wopi-lock"),
                        HeaderValue::from_str(&header_value)
                            .unwrap_or_else(|_| HeaderValue::from_static("")),
                    )],
                    Json(json!({ "error": "Lock mismatch" })),
                )
                    .into_response();
            }
            AppError::Unsupported(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
