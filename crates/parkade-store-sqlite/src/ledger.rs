//! [`SqlLedger`]: the event log and spot table over one SQLite connection.
//!
//! The ledger borrows a connection (normally an open transaction) and never
//! commits; the caller decides whether the work it did is kept.

use chrono::SubsecRound as _;
use rusqlite::{OptionalExtension as _, params, params_from_iter};
use uuid::Uuid;

use parkade_core::{
  event::{EventSeq, PendingEvent, VehicleEvent, VehicleStatus},
  ledger::{EventLog, Ledger, SpotAllocator},
  spot::Spot,
};

use crate::{
  Error, Result,
  encode::{EVENT_COLUMNS, RawEvent, encode_dt, encode_status, encode_uuid},
};

pub struct SqlLedger<'c> {
  conn: &'c rusqlite::Connection,
}

impl<'c> SqlLedger<'c> {
  pub fn new(conn: &'c rusqlite::Connection) -> Self { Self { conn } }

  fn query_events(
    &self,
    sql: &str,
    params: impl rusqlite::Params,
  ) -> Result<Vec<VehicleEvent>> {
    let mut stmt = self.conn.prepare(sql)?;
    let raws = stmt
      .query_map(params, RawEvent::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawEvent::into_event).collect()
  }

  /// Get-or-create spots `1..=capacity`.
  pub fn provision(&mut self, capacity: u32) -> Result<()> {
    let mut stmt = self
      .conn
      .prepare("INSERT OR IGNORE INTO spots (number, occupied) VALUES (?1, 0)")?;
    for number in 1..=capacity {
      stmt.execute(params![number])?;
    }
    Ok(())
  }

  fn spot_exists(&self, number: u32) -> Result<bool> {
    Ok(
      self
        .conn
        .query_row("SELECT 1 FROM spots WHERE number = ?1", params![number], |_| Ok(()))
        .optional()?
        .is_some(),
    )
  }
}

fn sql_limit(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

impl Ledger for SqlLedger<'_> {
  type Error = Error;
}

impl EventLog for SqlLedger<'_> {
  fn append(&mut self, mut event: PendingEvent) -> Result<VehicleEvent> {
    event.timestamp = event.timestamp.trunc_subsecs(6);

    self.conn.execute(
      "INSERT INTO vehicle_events (
         vehicle_id, license_plate, model, color, year,
         status, recorded_at, spot_number
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        encode_uuid(event.vehicle_id),
        event.vehicle.license_plate,
        event.vehicle.model,
        event.vehicle.color,
        event.vehicle.year,
        encode_status(event.status),
        encode_dt(event.timestamp),
        event.spot,
      ],
    )?;

    Ok(event.into_event(self.conn.last_insert_rowid()))
  }

  fn latest_per_vehicle(&self, filter: Option<&[VehicleStatus]>) -> Result<Vec<VehicleEvent>> {
    let statuses: Vec<&str> = filter
      .unwrap_or_default()
      .iter()
      .map(|s| encode_status(*s))
      .collect();

    let where_clause = match filter {
      None => String::new(),
      Some(_) => {
        let placeholders = vec!["?"; statuses.len()].join(", ");
        format!("WHERE status IN ({placeholders})")
      }
    };

    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM (
         SELECT *, ROW_NUMBER() OVER (
           PARTITION BY vehicle_id ORDER BY recorded_at DESC, seq DESC
         ) AS rn
         FROM vehicle_events
         {where_clause}
       )
       WHERE rn = 1
       ORDER BY recorded_at, seq"
    );
    self.query_events(&sql, params_from_iter(statuses))
  }

  fn earliest_per_vehicle(&self, status: VehicleStatus) -> Result<Vec<VehicleEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM (
         SELECT *, ROW_NUMBER() OVER (
           PARTITION BY vehicle_id ORDER BY recorded_at, seq
         ) AS rn
         FROM vehicle_events
         WHERE status = ?1
       )
       WHERE rn = 1
       ORDER BY recorded_at, seq"
    );
    self.query_events(&sql, params![encode_status(status)])
  }

  fn latest_for(&self, vehicle_id: Uuid) -> Result<Option<VehicleEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM vehicle_events
       WHERE vehicle_id = ?1
       ORDER BY recorded_at DESC, seq DESC
       LIMIT 1"
    );
    Ok(self.query_events(&sql, params![encode_uuid(vehicle_id)])?.pop())
  }

  fn timeline(&self, vehicle_id: Uuid) -> Result<Vec<VehicleEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM vehicle_events
       WHERE vehicle_id = ?1
       ORDER BY recorded_at, seq"
    );
    self.query_events(&sql, params![encode_uuid(vehicle_id)])
  }

  fn events_since(&self, cursor: Option<EventSeq>, limit: usize) -> Result<Vec<VehicleEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM vehicle_events
       WHERE seq > ?1
       ORDER BY seq
       LIMIT ?2"
    );
    self.query_events(&sql, params![cursor.unwrap_or(0), sql_limit(limit)])
  }

  fn recent(&self, limit: usize) -> Result<Vec<VehicleEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM (
         SELECT * FROM vehicle_events
         ORDER BY recorded_at DESC, seq DESC
         LIMIT ?1
       )
       ORDER BY recorded_at, seq"
    );
    self.query_events(&sql, params![sql_limit(limit)])
  }
}

impl SpotAllocator for SqlLedger<'_> {
  fn spots(&self) -> Result<Vec<Spot>> {
    let mut stmt = self
      .conn
      .prepare("SELECT number, occupied FROM spots ORDER BY number")?;
    let spots = stmt
      .query_map([], |r| Ok(Spot { number: r.get(0)?, occupied: r.get(1)? }))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(spots)
  }

  fn occupy(&mut self, number: u32) -> Result<()> {
    let changed = self.conn.execute(
      "UPDATE spots SET occupied = 1 WHERE number = ?1 AND occupied = 0",
      params![number],
    )?;
    if changed == 1 {
      return Ok(());
    }

    if self.spot_exists(number)? {
      Err(parkade_core::Error::SpotOccupied(number).into())
    } else {
      Err(parkade_core::Error::UnknownSpot(number).into())
    }
  }

  fn release(&mut self, number: u32) -> Result<()> {
    let changed = self
      .conn
      .execute("UPDATE spots SET occupied = 0 WHERE number = ?1", params![number])?;
    if changed == 0 {
      return Err(parkade_core::Error::UnknownSpot(number).into());
    }
    Ok(())
  }
}
