//! HTTP handlers for the pdfmark API

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pdfmark_core::{bake_to_bytes, export_file_name, page_count, Annotation, BakedPdf, Rgb};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

fn decode_pdf(pdf_base64: &str) -> Result<Vec<u8>, ApiError> {
    BASE64
        .decode(pdf_base64.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))
}

/// Run a bake on the blocking pool; lopdf work is CPU-bound.
async fn bake_blocking(pdf: Vec<u8>, annotations: Vec<Annotation>) -> Result<BakedPdf, ApiError> {
    tokio::task::spawn_blocking(move || bake_to_bytes(&pdf, &annotations))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("bake task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Bake annotations into an uploaded PDF and return it
pub async fn bake(Json(req): Json<BakeRequest>) -> Result<Json<BakeResponse>, ApiError> {
    let pdf = decode_pdf(&req.pdf_base64)?;
    let count = req.annotations.len();

    let baked = bake_blocking(pdf, req.annotations).await?;
    tracing::info!(
        "Baked {} annotations into {} ({} skipped)",
        count,
        req.document_name,
        baked.warnings.len()
    );

    Ok(Json(BakeResponse {
        file_name: export_file_name(&req.document_name),
        pdf_base64: BASE64.encode(&baked.bytes),
        status: baked.status(),
        warnings: baked.warnings.iter().map(WarningDto::from).collect(),
    }))
}

/// Upload a PDF and start an annotation session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let pdf = decode_pdf(&req.pdf_base64)?;

    let (pdf, pages) = tokio::task::spawn_blocking(move || {
        let pages = page_count(&pdf);
        (pdf, pages)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("page count task failed: {}", e)))?;
    let pages = pages?;

    let stored = state.store.create(req.document_name, &pdf, pages).await?;
    Ok((StatusCode::CREATED, Json(SessionSummary::from(&stored))))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let stored = state.store.get(&id).await?;
    Ok(Json(SessionSummary::from(&stored)))
}

/// Change the colour given to new highlights
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    if Rgb::from_hex(&req.selected_color).is_none() {
        return Err(ApiError::InvalidRequest(format!(
            "Invalid colour: {}",
            req.selected_color
        )));
    }
    let (stored, _) = state
        .store
        .update(&id, |session| {
            session.selected_color = req.selected_color;
            Ok(())
        })
        .await?;
    Ok(Json(SessionSummary::from(&stored)))
}

pub async fn add_annotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(annotation): Json<Annotation>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let (stored, annotation_id) = state
        .store
        .update(&id, |session| Ok(session.add(annotation)?))
        .await?;
    tracing::info!("Session {}: added annotation {}", id, annotation_id);
    Ok((StatusCode::CREATED, Json(SessionSummary::from(&stored))))
}

pub async fn upsert_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    let (stored, _) = state
        .store
        .update(&id, |session| {
            Ok(session.upsert_comment(req.page_number, req.x, req.y, req.content, req.metadata)?)
        })
        .await?;
    Ok(Json(SessionSummary::from(&stored)))
}

pub async fn update_annotation(
    State(state): State<Arc<AppState>>,
    Path((id, annotation_id)): Path<(String, String)>,
    Json(req): Json<UpdateAnnotationRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    if req.color.is_none() && req.content.is_none() {
        return Err(ApiError::InvalidRequest(
            "Nothing to update: expected color or content".to_string(),
        ));
    }

    let (stored, _) = state
        .store
        .update(&id, |session| {
            if let Some(color) = req.color {
                if !session.update_color(&annotation_id, color)? {
                    return Err(ApiError::InvalidRequest(format!(
                        "Annotation {} has no colour",
                        annotation_id
                    )));
                }
            }
            if let Some(content) = req.content {
                session.update_content(&annotation_id, content)?;
            }
            Ok(())
        })
        .await?;
    Ok(Json(SessionSummary::from(&stored)))
}

pub async fn undo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UndoResponse>, ApiError> {
    let (_, removed) = state
        .store
        .update(&id, |session| Ok(session.undo_last()))
        .await?;
    Ok(Json(UndoResponse { removed }))
}

pub async fn clear_annotations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let (stored, removed) = state
        .store
        .update(&id, |session| Ok(session.clear()))
        .await?;
    tracing::info!("Session {}: cleared {} annotations", id, removed);
    Ok(Json(SessionSummary::from(&stored)))
}

/// Bake the session's annotations and return the PDF for download
pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), ApiError> {
    let stored = state.store.get(&id).await?;
    let pdf = state.store.pdf_bytes(&id).await?;

    let baked = bake_blocking(pdf, stored.session.annotations().to_vec()).await?;
    for warning in &baked.warnings {
        tracing::warn!(
            "Session {}: skipped annotation {}: {}",
            id,
            warning.annotation_id,
            warning.error
        );
    }

    let file_name = stored.session.export_file_name().replace('"', "");
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert("x-pdfmark-skipped", HeaderValue::from(baked.warnings.len()));

    Ok((StatusCode::OK, headers, baked.bytes))
}
