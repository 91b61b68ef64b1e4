//! The three public forms: booking, feedback, estimate request.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::normalize::{clean_vin, normalize_engine_volume, normalize_passport_number};
use crate::ValidationErrors;

/// Accepted phone shape, e.g. `+79991234567`.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?1?\d{9,15}$").unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const PHONE_MESSAGE: &str = "Phone must look like +79991234567";
const REQUIRED_MESSAGE: &str = "This field is required";
const EMAIL_MESSAGE: &str = "Enter a valid email address";
const YEAR_MESSAGE: &str = "Year must be 1900 or later";

const MIN_VEHICLE_YEAR: i32 = 1900;

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// Raw booking submission as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub vehicle_brand: String,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_year: Option<i32>,
    #[serde(default)]
    pub vehicle_license_plate: Option<String>,
    #[serde(default)]
    pub vehicle_vin: Option<String>,
    #[serde(default)]
    pub vehicle_color: Option<String>,
    #[serde(default)]
    pub vehicle_passport_number: Option<String>,
    #[serde(default)]
    pub certificate_series_number: Option<String>,
    #[serde(default)]
    pub vehicle_engine_volume: Option<String>,
    #[serde(default)]
    pub vehicle_engine_power: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub consent_sms: bool,
    #[serde(default)]
    pub consent_email: bool,
}

/// Client identity fields of a validated booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSubmission {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub consent_sms: bool,
    pub consent_email: bool,
}

/// Vehicle fields of a validated booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleSubmission {
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub color: Option<String>,
}

/// Registration-certificate extras that only land in the vehicle notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateDetails {
    pub passport_number: Option<String>,
    pub certificate_series_number: Option<String>,
    pub engine_volume: Option<String>,
    pub engine_power: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub client: ClientSubmission,
    pub vehicle: VehicleSubmission,
    pub certificate: CertificateDetails,
    pub message: Option<String>,
}

impl BookingForm {
    pub fn validate(self) -> Result<ValidatedBooking, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let first_name = require(&mut errors, "first_name", &self.first_name);
        let last_name = require(&mut errors, "last_name", &self.last_name);
        let phone = require_phone(&mut errors, &self.phone);
        let email = optional_email(&mut errors, self.email.as_deref());
        let brand = require(&mut errors, "vehicle_brand", &self.vehicle_brand);
        let model = require(&mut errors, "vehicle_model", &self.vehicle_model);
        let year = check_year(&mut errors, self.vehicle_year);

        let validated = ValidatedBooking {
            client: ClientSubmission {
                first_name,
                last_name,
                phone,
                email,
                consent_sms: self.consent_sms,
                consent_email: self.consent_email,
            },
            vehicle: VehicleSubmission {
                brand,
                model,
                year,
                vin: self.vehicle_vin.as_deref().and_then(clean_vin),
                license_plate: optional_trimmed(self.vehicle_license_plate.as_deref()),
                color: optional_trimmed(self.vehicle_color.as_deref()),
            },
            certificate: CertificateDetails {
                passport_number: optional_trimmed(self.vehicle_passport_number.as_deref())
                    .map(|v| normalize_passport_number(&v)),
                certificate_series_number: optional_trimmed(
                    self.certificate_series_number.as_deref(),
                ),
                engine_volume: self
                    .vehicle_engine_volume
                    .as_deref()
                    .map(normalize_engine_volume)
                    .filter(|v| !v.is_empty()),
                engine_power: optional_trimmed(self.vehicle_engine_power.as_deref()),
            },
            message: optional_trimmed(self.message.as_deref()),
        };

        errors.into_result(validated)
    }
}

impl ValidatedBooking {
    /// Certificate data block for the vehicle notes, one `label: value`
    /// line per supplied field. `None` when nothing was supplied.
    pub fn certificate_note(&self) -> Option<String> {
        let lines: Vec<String> = [
            ("Vehicle passport no", &self.certificate.passport_number),
            (
                "Certificate series/number",
                &self.certificate.certificate_series_number,
            ),
            ("Engine volume", &self.certificate.engine_volume),
            ("Engine power", &self.certificate.engine_power),
        ]
        .iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}: {v}")))
        .collect();

        if lines.is_empty() {
            None
        } else {
            Some(format!("Certificate data:\n{}", lines.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFeedback {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub message: String,
}

impl FeedbackForm {
    pub fn validate(self) -> Result<ValidatedFeedback, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = require(&mut errors, "name", &self.name);
        let phone = require_phone(&mut errors, &self.phone);
        let email = optional_email(&mut errors, self.email.as_deref());
        let message = require(&mut errors, "message", &self.message);

        errors.into_result(ValidatedFeedback {
            name,
            phone,
            email,
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// Estimate request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub vehicle_brand: String,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_year: Option<i32>,
    #[serde(default)]
    pub work_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEstimate {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub vehicle_brand: String,
    pub vehicle_model: String,
    pub vehicle_year: Option<i32>,
    pub work_description: String,
}

impl EstimateForm {
    pub fn validate(self) -> Result<ValidatedEstimate, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = require(&mut errors, "name", &self.name);
        let phone = require_phone(&mut errors, &self.phone);
        let email = optional_email(&mut errors, self.email.as_deref());
        let vehicle_brand = require(&mut errors, "vehicle_brand", &self.vehicle_brand);
        let vehicle_model = require(&mut errors, "vehicle_model", &self.vehicle_model);
        let vehicle_year = check_year(&mut errors, self.vehicle_year);
        let work_description = require(&mut errors, "work_description", &self.work_description);

        errors.into_result(ValidatedEstimate {
            name,
            phone,
            email,
            vehicle_brand,
            vehicle_model,
            vehicle_year,
            work_description,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

fn require(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED_MESSAGE);
    }
    trimmed.to_string()
}

fn require_phone(errors: &mut ValidationErrors, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add("phone", REQUIRED_MESSAGE);
    } else if !PHONE_PATTERN.is_match(trimmed) {
        errors.add("phone", PHONE_MESSAGE);
    }
    trimmed.to_string()
}

fn optional_email(errors: &mut ValidationErrors, value: Option<&str>) -> Option<String> {
    let trimmed = optional_trimmed(value)?;
    if !EMAIL_PATTERN.is_match(&trimmed) {
        errors.add("email", EMAIL_MESSAGE);
    }
    Some(trimmed)
}

fn check_year(errors: &mut ValidationErrors, year: Option<i32>) -> Option<i32> {
    if let Some(y) = year {
        if y < MIN_VEHICLE_YEAR {
            errors.add("vehicle_year", YEAR_MESSAGE);
        }
    }
    year
}

/// Trim an optional field; blank strings collapse to `None`.
fn optional_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
