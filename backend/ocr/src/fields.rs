//! The fixed output schema handed to the booking form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registration-certificate fields recognized from the uploaded photo.
///
/// Always fully populated: keys the agent did not supply become empty
/// strings, so the consumer never has to branch on presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFields {
    pub vehicle_vin: String,
    pub vehicle_year: String,
    pub vehicle_license_plate: String,
    pub vehicle_color: String,
    pub vehicle_passport_number: String,
    pub certificate_series_number: String,
    pub vehicle_brand: String,
    pub vehicle_model: String,
    pub vehicle_engine_volume: String,
    pub vehicle_engine_power: String,
}

impl DocumentFields {
    /// Map the agent's output object onto the fixed field set.
    ///
    /// `vehicle_body_number` is an older key some agent prompts emit for
    /// the document number; it is accepted when `vehicle_passport_number`
    /// is absent.
    pub fn from_output(output: &Map<String, Value>) -> Self {
        Self {
            vehicle_vin: text(output, "vehicle_vin"),
            vehicle_year: text(output, "vehicle_year"),
            vehicle_license_plate: text(output, "vehicle_license_plate"),
            vehicle_color: text(output, "vehicle_color"),
            vehicle_passport_number: if output.contains_key("vehicle_passport_number") {
                text(output, "vehicle_passport_number")
            } else {
                text(output, "vehicle_body_number")
            },
            certificate_series_number: text(output, "certificate_series_number"),
            vehicle_brand: text(output, "vehicle_brand"),
            vehicle_model: text(output, "vehicle_model"),
            vehicle_engine_volume: text(output, "vehicle_engine_volume"),
            vehicle_engine_power: text(output, "vehicle_engine_power"),
        }
    }
}

/// Agents return model years and power figures as JSON numbers about as
/// often as strings; both coerce to text.
fn text(output: &Map<String, Value>, key: &str) -> String {
    match output.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
