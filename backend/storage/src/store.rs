//! SQLite-backed store for clients and their vehicles.
//!
//! Uses `rusqlite` behind a `tokio::sync::Mutex`; timestamps are kept by
//! the application, not by triggers. Booking submissions arrive repeatedly
//! from the same people, so both tables upsert on their natural key instead
//! of inserting blindly.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{AttractionChannel, ClientRecord, NewClient, VehicleDetails, VehicleRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS clients (
     id                 INTEGER PRIMARY KEY AUTOINCREMENT,
     first_name         TEXT NOT NULL,
     last_name          TEXT NOT NULL,
     middle_name        TEXT,
     phone              TEXT NOT NULL UNIQUE,
     email              TEXT,
     attraction_channel TEXT NOT NULL DEFAULT 'website',
     consent_sms        INTEGER NOT NULL DEFAULT 0,
     consent_email      INTEGER NOT NULL DEFAULT 0,
     consent_phone      INTEGER NOT NULL DEFAULT 1,
     notes              TEXT,
     created_at         TEXT NOT NULL,
     updated_at         TEXT NOT NULL
 );
 CREATE TABLE IF NOT EXISTS vehicles (
     id            INTEGER PRIMARY KEY AUTOINCREMENT,
     client_id     INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
     brand         TEXT NOT NULL,
     model         TEXT NOT NULL,
     year          INTEGER,
     vin           TEXT UNIQUE,
     license_plate TEXT,
     mileage       INTEGER,
     color         TEXT,
     notes         TEXT,
     created_at    TEXT NOT NULL,
     updated_at    TEXT NOT NULL
 );
 CREATE INDEX IF NOT EXISTS idx_clients_phone ON clients(phone);
 CREATE INDEX IF NOT EXISTS idx_vehicles_client ON vehicles(client_id);
 CREATE INDEX IF NOT EXISTS idx_vehicles_plate ON vehicles(license_plate);";

pub struct ServiceStore {
    conn: Mutex<Connection>,
}

impl ServiceStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open the service database")?;
        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .context("Failed to initialize the service schema")?;

        info!("ServiceStore opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the client if the phone is unknown, otherwise refresh the
    /// name (and email, when supplied). Returns `(id, created)`.
    pub async fn upsert_client(&self, new: &NewClient) -> Result<(i64, bool)> {
        let conn = self.conn.lock().await;
        let now = Utc::now();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM clients WHERE phone = ?1",
                params![new.phone],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            if let Some(email) = &new.email {
                conn.execute(
                    "UPDATE clients SET first_name = ?1, last_name = ?2, email = ?3,
                         updated_at = ?4 WHERE id = ?5",
                    params![new.first_name, new.last_name, email, now, id],
                )?;
            } else {
                conn.execute(
                    "UPDATE clients SET first_name = ?1, last_name = ?2, updated_at = ?3
                         WHERE id = ?4",
                    params![new.first_name, new.last_name, now, id],
                )?;
            }
            debug!(client_id = id, "Refreshed existing client");
            return Ok((id, false));
        }

        conn.execute(
            "INSERT INTO clients (first_name, last_name, phone, email, attraction_channel,
                 consent_sms, consent_email, consent_phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.first_name,
                new.last_name,
                new.phone,
                new.email,
                AttractionChannel::Website.as_str(),
                new.consent_sms,
                new.consent_email,
                true,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(client_id = id, "Created client");
        Ok((id, true))
    }

    /// Create or refresh a vehicle keyed by `(client, license plate)`; a
    /// missing plate keys one "no plate" vehicle per client. On refresh the
    /// year is kept unless a new one is supplied; vin/color/plate are
    /// overwritten as submitted. Returns the vehicle id.
    pub async fn upsert_vehicle(&self, client_id: i64, details: &VehicleDetails) -> Result<i64> {
        let conn = self.conn.lock().await;
        let now = Utc::now();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM vehicles WHERE client_id = ?1 AND license_plate IS ?2",
                params![client_id, details.license_plate],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE vehicles SET brand = ?1, model = ?2, year = COALESCE(?3, year),
                     vin = ?4, color = ?5, license_plate = ?6, updated_at = ?7 WHERE id = ?8",
                params![
                    details.brand,
                    details.model,
                    details.year,
                    details.vin,
                    details.color,
                    details.license_plate,
                    now,
                    id,
                ],
            )?;
            debug!(vehicle_id = id, "Refreshed existing vehicle");
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO vehicles (client_id, brand, model, year, vin, license_plate, color,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                client_id,
                details.brand,
                details.model,
                details.year,
                details.vin,
                details.license_plate,
                details.color,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(vehicle_id = id, "Created vehicle");
        Ok(id)
    }

    /// Put a note block in front of the vehicle's existing notes.
    pub async fn prepend_vehicle_note(&self, vehicle_id: i64, note: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE vehicles SET notes = CASE
                 WHEN notes IS NULL OR notes = '' THEN ?1
                 ELSE ?1 || char(10) || char(10) || notes END,
                 updated_at = ?2
             WHERE id = ?3",
            params![note, Utc::now(), vehicle_id],
        )?;
        Ok(())
    }

    /// Append a note block after the vehicle's existing notes.
    pub async fn append_vehicle_note(&self, vehicle_id: i64, note: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE vehicles SET notes = CASE
                 WHEN notes IS NULL OR notes = '' THEN ?1
                 ELSE notes || char(10) || char(10) || ?1 END,
                 updated_at = ?2
             WHERE id = ?3",
            params![note, Utc::now(), vehicle_id],
        )?;
        Ok(())
    }

    pub async fn find_client_by_phone(&self, phone: &str) -> Result<Option<ClientRecord>> {
        let conn = self.conn.lock().await;
        let record = conn
            .query_row(
                "SELECT id, first_name, last_name, middle_name, phone, email,
                     attraction_channel, consent_sms, consent_email, consent_phone, notes,
                     created_at, updated_at
                 FROM clients WHERE phone = ?1",
                params![phone],
                row_to_client,
            )
            .optional()?;
        Ok(record)
    }

    pub async fn vehicles_for_client(&self, client_id: i64) -> Result<Vec<VehicleRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, client_id, brand, model, year, vin, license_plate, mileage, color,
                 notes, created_at, updated_at
             FROM vehicles WHERE client_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![client_id], row_to_vehicle)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_client(row: &Row<'_>) -> rusqlite::Result<ClientRecord> {
    let channel: String = row.get(6)?;
    Ok(ClientRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        middle_name: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        attraction_channel: AttractionChannel::parse(&channel),
        consent_sms: row.get(7)?,
        consent_email: row.get(8)?,
        consent_phone: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_vehicle(row: &Row<'_>) -> rusqlite::Result<VehicleRecord> {
    Ok(VehicleRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        brand: row.get(2)?,
        model: row.get(3)?,
        year: row.get(4)?,
        vin: row.get(5)?,
        license_plate: row.get(6)?,
        mileage: row.get(7)?,
        color: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(phone: &str) -> NewClient {
        NewClient {
            first_name: "Anna".into(),
            last_name: "Petrova".into(),
            phone: phone.into(),
            email: None,
            consent_sms: false,
            consent_email: false,
        }
    }

    fn vehicle(plate: Option<&str>) -> VehicleDetails {
        VehicleDetails {
            brand: "Renault".into(),
            model: "Duster".into(),
            year: Some(2019),
            license_plate: plate.map(str::to_string),
            ..VehicleDetails::default()
        }
    }

    #[tokio::test]
    async fn client_created_then_refreshed_by_phone() {
        let store = ServiceStore::in_memory().unwrap();

        let (id, created) = store.upsert_client(&client("+79991234567")).await.unwrap();
        assert!(created);

        let mut update = client("+79991234567");
        update.first_name = "Ann".into();
        update.email = Some("ann@example.com".into());
        let (id2, created2) = store.upsert_client(&update).await.unwrap();
        assert_eq!(id, id2);
        assert!(!created2);

        let record = store
            .find_client_by_phone("+79991234567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.first_name, "Ann");
        assert_eq!(record.email.as_deref(), Some("ann@example.com"));
        assert_eq!(record.attraction_channel, AttractionChannel::Website);
        assert!(record.consent_phone);
    }

    #[tokio::test]
    async fn refresh_without_email_keeps_stored_email() {
        let store = ServiceStore::in_memory().unwrap();

        let mut first = client("+79991234567");
        first.email = Some("kept@example.com".into());
        store.upsert_client(&first).await.unwrap();

        store.upsert_client(&client("+79991234567")).await.unwrap();
        let record = store
            .find_client_by_phone("+79991234567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.email.as_deref(), Some("kept@example.com"));
    }

    #[tokio::test]
    async fn vehicle_keyed_by_client_and_plate() {
        let store = ServiceStore::in_memory().unwrap();
        let (client_id, _) = store.upsert_client(&client("+79991234567")).await.unwrap();

        let id = store
            .upsert_vehicle(client_id, &vehicle(Some("A123BC77")))
            .await
            .unwrap();

        let mut update = vehicle(Some("A123BC77"));
        update.model = "Duster II".into();
        update.year = None;
        let id2 = store.upsert_vehicle(client_id, &update).await.unwrap();
        assert_eq!(id, id2);

        let vehicles = store.vehicles_for_client(client_id).await.unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].model, "Duster II");
        // A refresh without a year keeps the stored one.
        assert_eq!(vehicles[0].year, Some(2019));
    }

    #[tokio::test]
    async fn distinct_plates_create_distinct_vehicles() {
        let store = ServiceStore::in_memory().unwrap();
        let (client_id, _) = store.upsert_client(&client("+79991234567")).await.unwrap();

        store
            .upsert_vehicle(client_id, &vehicle(Some("A123BC77")))
            .await
            .unwrap();
        store
            .upsert_vehicle(client_id, &vehicle(Some("B456DE77")))
            .await
            .unwrap();
        store.upsert_vehicle(client_id, &vehicle(None)).await.unwrap();
        // The plateless slot is reused on resubmission.
        store.upsert_vehicle(client_id, &vehicle(None)).await.unwrap();

        let vehicles = store.vehicles_for_client(client_id).await.unwrap();
        assert_eq!(vehicles.len(), 3);
    }

    #[tokio::test]
    async fn notes_prepend_and_append() {
        let store = ServiceStore::in_memory().unwrap();
        let (client_id, _) = store.upsert_client(&client("+79991234567")).await.unwrap();
        let vehicle_id = store
            .upsert_vehicle(client_id, &vehicle(Some("A123BC77")))
            .await
            .unwrap();

        store
            .append_vehicle_note(vehicle_id, "brakes squeal at low speed")
            .await
            .unwrap();
        store
            .prepend_vehicle_note(vehicle_id, "Certificate data:\nEngine power: 143")
            .await
            .unwrap();

        let vehicles = store.vehicles_for_client(client_id).await.unwrap();
        let notes = vehicles[0].notes.as_deref().unwrap();
        assert_eq!(
            notes,
            "Certificate data:\nEngine power: 143\n\nbrakes squeal at low speed"
        );
    }
}
