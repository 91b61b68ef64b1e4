use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a client found the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractionChannel {
    #[default]
    Website,
    Recommendation,
    Advertising,
    WalkIn,
    Other,
}

impl AttractionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Recommendation => "recommendation",
            Self::Advertising => "advertising",
            Self::WalkIn => "walk_in",
            Self::Other => "other",
        }
    }

    /// Lenient parse for values read back from the database.
    pub fn parse(s: &str) -> Self {
        match s {
            "website" => Self::Website,
            "recommendation" => Self::Recommendation,
            "advertising" => Self::Advertising,
            "walk_in" => Self::WalkIn,
            _ => Self::Other,
        }
    }
}

/// A stored client row.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub attraction_channel: AttractionChannel,
    pub consent_sms: bool,
    pub consent_email: bool,
    pub consent_phone: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or refreshing a client from the site.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub consent_sms: bool,
    pub consent_email: bool,
}

/// A stored vehicle row.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleRecord {
    pub id: i64,
    pub client_id: i64,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub mileage: Option<i64>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or refreshing a vehicle from the site.
#[derive(Debug, Clone, Default)]
pub struct VehicleDetails {
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub color: Option<String>,
}
