//! Registration-certificate photo upload.
//!
//! The photo is forwarded to the recognition workflow and the recovered
//! fields come back for form pre-fill. Recognition failures are reported in
//! the response body with a 200 status: the booking flow must degrade to
//! manual entry, not fail.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::AppState;

/// Upload ceiling for the certificate photo.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub async fn recognize_certificate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut image: Option<Vec<u8>> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            match field.bytes().await {
                Ok(bytes) => image = Some(bytes.to_vec()),
                Err(err) => {
                    error!(error = %err, "Failed to read the uploaded image");
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "Failed to read the uploaded image" })),
                    );
                }
            }
            break;
        }
    }
    process_image(&state, image).await
}

/// Guard checks and the workflow call, split from the multipart extractor
/// so they can be exercised without constructing multipart bodies.
pub(crate) async fn process_image(
    state: &AppState,
    image: Option<Vec<u8>>,
) -> (StatusCode, Json<Value>) {
    let Some(image) = image else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No image supplied" })),
        );
    };
    if image.len() > MAX_IMAGE_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "File is too large (max 10 MB)" })),
        );
    }
    let Some(ocr) = &state.ocr else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Document recognition is not configured" })),
        );
    };

    info!(bytes = image.len(), "Submitting certificate photo to the recognition workflow");
    let image_base64 = STANDARD.encode(&image);

    match ocr.recognize(&image_base64).await {
        Ok(fields) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": fields })),
        ),
        Err(err) => {
            error!(error = %err, "Certificate recognition failed");
            // Recognition errors still answer 200: the form falls back to
            // manual entry.
            (
                StatusCode::OK,
                Json(json!({ "error": err.to_string(), "data": {} })),
            )
        }
    }
}
