//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! fraction, so lexicographic order is chronological order. UUIDs are stored
//! as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use parkade_core::event::{EventSeq, Vehicle, VehicleEvent, VehicleStatus};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── VehicleStatus ───────────────────────────────────────────────────────────

pub fn encode_status(status: VehicleStatus) -> &'static str { status.as_str() }

pub fn decode_status(s: &str) -> Result<VehicleStatus> {
  s.parse().map_err(Error::Status)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "seq, vehicle_id, license_plate, model, color, year, status, \
                                 recorded_at, spot_number";

/// Raw values read directly from a `vehicle_events` row.
pub struct RawEvent {
  pub seq:           EventSeq,
  pub vehicle_id:    String,
  pub license_plate: String,
  pub model:         String,
  pub color:         String,
  pub year:          Option<u16>,
  pub status:        String,
  pub recorded_at:   String,
  pub spot_number:   Option<u32>,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:           row.get(0)?,
      vehicle_id:    row.get(1)?,
      license_plate: row.get(2)?,
      model:         row.get(3)?,
      color:         row.get(4)?,
      year:          row.get(5)?,
      status:        row.get(6)?,
      recorded_at:   row.get(7)?,
      spot_number:   row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<VehicleEvent> {
    Ok(VehicleEvent {
      seq:        self.seq,
      vehicle_id: decode_uuid(&self.vehicle_id)?,
      vehicle:    Vehicle {
        license_plate: self.license_plate,
        model:         self.model,
        color:         self.color,
        year:          self.year,
      },
      status:     decode_status(&self.status)?,
      timestamp:  decode_dt(&self.recorded_at)?,
      spot:       self.spot_number,
    })
  }
}
