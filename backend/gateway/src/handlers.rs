//! JSON handlers for the public forms.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};

use pitstop_forms::{BookingForm, EstimateForm, FeedbackForm, ValidationErrors};
use pitstop_storage::{NewClient, VehicleDetails};

use crate::AppState;

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pitstop",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Booking form: upserts the client and vehicle records and stashes the
/// certificate details and customer message in the vehicle notes.
pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    Json(form): Json<BookingForm>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let booking = form.validate().map_err(validation_reply)?;

    let (client_id, new_client) = state
        .store
        .upsert_client(&NewClient {
            first_name: booking.client.first_name.clone(),
            last_name: booking.client.last_name.clone(),
            phone: booking.client.phone.clone(),
            email: booking.client.email.clone(),
            consent_sms: booking.client.consent_sms,
            consent_email: booking.client.consent_email,
        })
        .await
        .map_err(internal_reply)?;

    let vehicle_id = state
        .store
        .upsert_vehicle(
            client_id,
            &VehicleDetails {
                brand: booking.vehicle.brand.clone(),
                model: booking.vehicle.model.clone(),
                year: booking.vehicle.year,
                vin: booking.vehicle.vin.clone(),
                license_plate: booking.vehicle.license_plate.clone(),
                color: booking.vehicle.color.clone(),
            },
        )
        .await
        .map_err(internal_reply)?;

    if let Some(note) = booking.certificate_note() {
        state
            .store
            .prepend_vehicle_note(vehicle_id, &note)
            .await
            .map_err(internal_reply)?;
    }
    if let Some(message) = &booking.message {
        state
            .store
            .append_vehicle_note(vehicle_id, message)
            .await
            .map_err(internal_reply)?;
    }

    info!(client_id, vehicle_id, new_client, "Booking request stored");
    Ok(Json(json!({
        "success": true,
        "message": "Your booking request has been received. We will contact you shortly.",
    })))
}

/// Feedback form: submissions are logged for follow-up, not persisted.
pub async fn submit_feedback(
    Json(form): Json<FeedbackForm>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let feedback = form.validate().map_err(validation_reply)?;

    info!(
        name = %feedback.name,
        phone = %feedback.phone,
        email = feedback.email.as_deref().unwrap_or(""),
        message = %feedback.message,
        "Feedback received"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Thank you for your message. We will contact you shortly.",
    })))
}

/// Estimate-request form: submissions are logged for follow-up, not
/// persisted.
pub async fn submit_estimate(
    Json(form): Json<EstimateForm>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let estimate = form.validate().map_err(validation_reply)?;

    info!(
        name = %estimate.name,
        phone = %estimate.phone,
        vehicle = %format!("{} {}", estimate.vehicle_brand, estimate.vehicle_model),
        work_description = %estimate.work_description,
        "Estimate request received"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Your estimate request has been received. We will contact you shortly.",
    })))
}

fn validation_reply(errors: ValidationErrors) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "errors": errors })),
    )
}

fn internal_reply(err: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!(error = %err, "Failed to process the request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Failed to process the request. Please try again later.",
        })),
    )
}
