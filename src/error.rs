use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// JSON error body: `{"error": "...", "message": "..."}`.
///
/// `message` is only present on upstream failures, where it carries the
/// underlying error text for diagnostics.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("QUEUE_APPSCRIPT_URL not configured")]
    MissingUpstream,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body, error_type) = match &self {
            AppError::MissingUpstream => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "QUEUE_APPSCRIPT_URL not configured".to_string(),
                    message: None,
                },
                "config",
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody {
                    error: "Method not allowed".to_string(),
                    message: None,
                },
                "method_not_allowed",
            ),
            AppError::Upstream(e) => {
                error!(error = %format!("{e:#}"), "Queue proxy error");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "Proxy error".to_string(),
                        // Alternate formatting keeps the whole context chain so the
                        // caller sees the underlying cause, not just the stage.
                        message: Some(format!("{e:#}")),
                    },
                    "upstream",
                )
            }
        };

        metrics::counter!("http_errors_total", "error_type" => error_type).increment(1);

        (status, axum::Json(body)).into_response()
    }
}
