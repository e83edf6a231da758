//! Error types for the pdfmark API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfmark_core::{PdfMarkError, SessionError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unprocessable document: {0}")]
    UnprocessableDocument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PdfMarkError> for ApiError {
    fn from(e: PdfMarkError) -> Self {
        match e {
            PdfMarkError::Load(msg) => ApiError::UnprocessableDocument(msg),
            PdfMarkError::Serialization(msg) => ApiError::InvalidRequest(msg),
            PdfMarkError::Save(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::DuplicateId(id) => {
                ApiError::InvalidRequest(format!("Duplicate annotation id: {}", id))
            }
            SessionError::NotFound(id) => ApiError::AnnotationNotFound(id),
            SessionError::MissingContent(kind) => {
                ApiError::InvalidRequest(format!("{} annotation needs content", kind))
            }
            SessionError::Serialization(e) => ApiError::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Session not found: {}", id))
            }
            ApiError::AnnotationNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Annotation not found: {}", id),
            ),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::UnprocessableDocument(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Could not load PDF: {}", msg),
            ),
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
