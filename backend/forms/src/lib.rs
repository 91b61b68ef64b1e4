//! Validation and normalization for the public site forms.
//!
//! Checks accumulate into a field → message map instead of failing on the
//! first problem, so the caller can report every broken field at once.

mod forms;
mod normalize;

pub use forms::{
    BookingForm, CertificateDetails, ClientSubmission, EstimateForm, FeedbackForm,
    ValidatedBooking, ValidatedEstimate, ValidatedFeedback, VehicleSubmission,
};
pub use normalize::{clean_vin, normalize_engine_volume, normalize_passport_number};

use std::collections::BTreeMap;

use serde::Serialize;

/// Field → message map accumulated across all checks on one form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finish a validation pass: `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}
