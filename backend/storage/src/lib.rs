//! SQLite persistence for the two site tables.
//!
//! Clients and vehicles follow create-or-update-on-unique-key semantics:
//! clients are keyed by phone, vehicles by (client, license plate).

mod store;
mod types;

pub use store::ServiceStore;
pub use types::{AttractionChannel, ClientRecord, NewClient, VehicleDetails, VehicleRecord};
