use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures that end a webhook delivery early.
///
/// Per-setting failures are not represented here; they are recorded in
/// `ConfigurationOutcome` and never abort the batch.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("{0}")]
    MalformedRequest(String),

    /// Never carries key material, only the reason the key was rejected.
    #[error("Failed to sign app assertion: {0}")]
    KeySigning(String),

    #[error("Failed to get installation token: {status} {body}")]
    CredentialExchange { status: u16, body: String },

    #[error("GitHub request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::KeySigning(_)
            | AppError::CredentialExchange { .. }
            | AppError::Upstream(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::InvalidSignature | AppError::MalformedRequest(_) => {
                (status, self.to_string()).into_response()
            }
            _ => (status, Json(json!({ "error": self.to_string() }))).into_response(),
        }
    }
}
