//! Request and response bodies

use chrono::{DateTime, Utc};
use pdfmark_core::{Annotation, AnnotationSession, BakeStatus, BakeWarning, ViewerMetadata};
use serde::{Deserialize, Serialize};

/// One-shot bake of an uploaded PDF
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BakeRequest {
    #[serde(default)]
    pub document_name: String,
    pub pdf_base64: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WarningDto {
    pub annotation_id: String,
    pub page_index: Option<usize>,
    pub reason: String,
}

impl From<&BakeWarning> for WarningDto {
    fn from(w: &BakeWarning) -> Self {
        Self {
            annotation_id: w.annotation_id.clone(),
            page_index: w.page_index,
            reason: w.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BakeResponse {
    pub file_name: String,
    pub pdf_base64: String,
    pub status: BakeStatus,
    pub warnings: Vec<WarningDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub document_name: String,
    pub pdf_base64: String,
}

/// Session record persisted next to the source PDF
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: String,
    pub document_hash: String,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub session: AnnotationSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub document_name: String,
    pub document_hash: String,
    pub page_count: usize,
    pub annotations: Vec<Annotation>,
    pub selected_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredSession> for SessionSummary {
    fn from(s: &StoredSession) -> Self {
        Self {
            id: s.id.clone(),
            document_name: s.session.document_name.clone(),
            document_hash: s.document_hash.clone(),
            page_count: s.page_count,
            annotations: s.session.annotations().to_vec(),
            selected_color: s.session.selected_color.clone(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub selected_color: String,
}

/// Place a comment, editing a nearby one in place
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub x: f64,
    pub y: f64,
    pub page_number: i64,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<ViewerMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnotationRequest {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResponse {
    pub removed: Option<Annotation>,
}
