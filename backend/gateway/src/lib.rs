//! HTTP API for the public car-service site.
//!
//! JSON endpoints for the booking, feedback and estimate forms, plus the
//! registration-certificate photo upload that pre-fills the booking form
//! via the recognition workflow.

pub mod handlers;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use pitstop_ocr::WorkflowOcrClient;
use pitstop_storage::ServiceStore;

/// Shared application state for API handlers.
pub struct AppState {
    pub store: ServiceStore,
    /// Absent when the workflow endpoint is not configured; the OCR route
    /// answers 503 in that case.
    pub ocr: Option<WorkflowOcrClient>,
}

/// Build the Axum router with all API routes.
///
/// The body limit sits above the documented 10 MB image cap so the upload
/// handler gets to reject oversized files with its own error message.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/booking", post(handlers::submit_booking))
        .route("/api/booking/ocr-sts", post(upload::recognize_certificate))
        .route("/api/feedback", post(handlers::submit_feedback))
        .route("/api/estimate", post(handlers::submit_estimate))
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024))
        .with_state(state)
}
