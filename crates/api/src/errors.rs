use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use orgguard_auth::AuthzError;

/// Why the guard refused a request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A guarded route was reached without a principal.
    #[error("authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Denied(#[from] AuthzError),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::Unauthenticated => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
            }
            // The reason stays in the logs; callers only learn that they were refused.
            GuardError::Denied(_) => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
