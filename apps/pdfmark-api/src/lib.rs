//! pdfmark API - HTTP front end for annotation baking
//!
//! Provides REST endpoints for:
//! - One-shot bakes of an uploaded PDF
//! - Annotation sessions with undo, clear and comment editing
//! - Export of the baked document

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Build the router over shared state.
pub fn app(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Stateless bake
        .route("/api/bake", post(handlers::bake))
        // Session endpoints
        .route("/api/session", post(handlers::create_session))
        .route(
            "/api/session/:id",
            get(handlers::get_session).patch(handlers::update_session),
        )
        .route(
            "/api/session/:id/annotations",
            post(handlers::add_annotation).delete(handlers::clear_annotations),
        )
        .route(
            "/api/session/:id/annotations/:annotation_id",
            axum::routing::patch(handlers::update_annotation),
        )
        .route("/api/session/:id/comments", post(handlers::upsert_comment))
        .route("/api/session/:id/undo", post(handlers::undo))
        // Document delivery
        .route("/api/session/:id/export", get(handlers::export))
        // Add middleware
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
