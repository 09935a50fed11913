use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{auth::AuthError, media::UploadError, repository::StoreError};

/// AppError
///
/// The single error type returned by handlers and the `AuthUser` extractor.
/// External collaborator failures are logged here with full detail and answered with a
/// generic 500 body, so provider messages never reach the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Validation(String),

    #[error("invalid multipart body: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("Media host credentials are not set")]
    MediaHostNotConfigured,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            // 413 when the body limit is exceeded, 400 otherwise.
            AppError::Multipart(e) => e.status(),
            AppError::MediaHostNotConfigured | AppError::Upload(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Auth(e) => {
                tracing::debug!(error = %e, "session token rejected");
                "Unauthorized".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::Multipart(_) => self.to_string(),
            AppError::MediaHostNotConfigured => {
                tracing::error!("upload attempted without media host credentials");
                self.to_string()
            }
            AppError::Upload(e) => {
                tracing::error!(error = ?e, "media host upload failed");
                "Internal Server Error".to_string()
            }
            AppError::Store(e) => {
                tracing::error!(error = ?e, "record store operation failed");
                "Internal Server Error".to_string()
            }
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}
