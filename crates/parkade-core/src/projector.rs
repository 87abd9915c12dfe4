//! The state projector: derives the facility view from the ledger.
//!
//! Nothing here is stored. Buckets, occupancy and billing are recomputed on
//! every call from the spot table and the event log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  event::{VehicleEvent, VehicleStatus},
  ledger::{EventLog, SpotAllocator},
  spot::Spot,
};

pub const DEFAULT_RATE_PER_SECOND: f64 = 0.03;
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

// ─── Occupancy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyLabel {
  /// Under half full.
  Available,
  HalfFull,
  Full,
}

impl OccupancyLabel {
  pub fn from_percent(percent: f64) -> Self {
    if percent >= 100.0 {
      OccupancyLabel::Full
    } else if percent < 50.0 {
      OccupancyLabel::Available
    } else {
      OccupancyLabel::HalfFull
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OccupancyLabel::Available => "available",
      OccupancyLabel::HalfFull => "halffull",
      OccupancyLabel::Full => "full",
    }
  }
}

/// `occupied / total × 100`. A facility with no spots reports `0.0`.
pub fn occupancy_percent(occupied: usize, total: usize) -> f64 {
  if total == 0 {
    return 0.0;
  }
  occupied as f64 / total as f64 * 100.0
}

fn round_cents(amount: f64) -> f64 { (amount * 100.0).round() / 100.0 }

// ─── Snapshot types ──────────────────────────────────────────────────────────

/// A finished visit: first `Entering` to latest `HasLeft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub vehicle_id:    Uuid,
  pub license_plate: String,
  pub start:         DateTime<Utc>,
  pub end:           DateTime<Utc>,
  /// Whole seconds between `start` and `end`.
  pub seconds:       i64,
  pub cost:          f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counts {
  pub entering:   usize,
  pub parked:     usize,
  pub leaving:    usize,
  pub has_left:   usize,
  /// Sum of all finished session costs, rounded to cents.
  pub total_cash: f64,
}

/// The computed read model of the facility; never stored, always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
  pub spots:             Vec<Spot>,
  pub entering:          Vec<VehicleEvent>,
  pub parked:            Vec<VehicleEvent>,
  pub leaving:           Vec<VehicleEvent>,
  /// Most recent events, oldest first.
  pub history:           Vec<VehicleEvent>,
  pub occupancy_percent: f64,
  pub occupancy_label:   OccupancyLabel,
  pub counts:            Counts,
  pub finished_sessions: Vec<Session>,
}

// ─── Projector ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateProjector {
  pub rate_per_second: f64,
  pub history_limit:   usize,
}

impl Default for StateProjector {
  fn default() -> Self {
    Self {
      rate_per_second: DEFAULT_RATE_PER_SECOND,
      history_limit:   DEFAULT_HISTORY_LIMIT,
    }
  }
}

impl StateProjector {
  /// Build a snapshot. The caller supplies a ledger that reads from one
  /// consistent point in time (a read transaction or a read lock).
  pub fn snapshot<L>(&self, ledger: &L) -> Result<StateSnapshot, L::Error>
  where
    L: EventLog + SpotAllocator,
  {
    let spots = ledger.spots()?;

    let mut entering = Vec::new();
    let mut parked = Vec::new();
    let mut leaving = Vec::new();
    let mut has_left = 0;
    for event in ledger.latest_per_vehicle(None)? {
      match event.status {
        VehicleStatus::Entering => entering.push(event),
        VehicleStatus::Parked => parked.push(event),
        VehicleStatus::Leaving => leaving.push(event),
        VehicleStatus::HasLeft => has_left += 1,
      }
    }

    let history = ledger.recent(self.history_limit)?;
    let finished_sessions = self.sessions(ledger)?;
    let total_cash = round_cents(finished_sessions.iter().map(|s| s.cost).sum());

    let occupied = spots.iter().filter(|s| s.occupied).count();
    let percent = occupancy_percent(occupied, spots.len());

    Ok(StateSnapshot {
      counts: Counts {
        entering: entering.len(),
        parked: parked.len(),
        leaving: leaving.len(),
        has_left,
        total_cash,
      },
      spots,
      entering,
      parked,
      leaving,
      history,
      occupancy_percent: percent,
      occupancy_label: OccupancyLabel::from_percent(percent),
      finished_sessions,
    })
  }

  /// Pair each departed vehicle's first `Entering` with its latest `HasLeft`.
  /// Ordered by departure.
  pub fn sessions<L: EventLog>(&self, ledger: &L) -> Result<Vec<Session>, L::Error> {
    let mut starts: HashMap<Uuid, VehicleEvent> = ledger
      .earliest_per_vehicle(VehicleStatus::Entering)?
      .into_iter()
      .map(|e| (e.vehicle_id, e))
      .collect();

    let ends = ledger.latest_per_vehicle(Some(&[VehicleStatus::HasLeft]))?;

    Ok(
      ends
        .into_iter()
        .filter_map(|end| {
          let start = starts.remove(&end.vehicle_id)?;
          Some(self.session(&start, end))
        })
        .collect(),
    )
  }

  fn session(&self, start: &VehicleEvent, end: VehicleEvent) -> Session {
    let seconds = (end.timestamp - start.timestamp).num_seconds().max(0);
    Session {
      vehicle_id:    end.vehicle_id,
      license_plate: end.vehicle.license_plate,
      start:         start.timestamp,
      end:           end.timestamp,
      seconds,
      cost:          round_cents(seconds as f64 * self.rate_per_second),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_boundaries() {
    assert_eq!(OccupancyLabel::from_percent(0.0), OccupancyLabel::Available);
    assert_eq!(OccupancyLabel::from_percent(49.99), OccupancyLabel::Available);
    assert_eq!(OccupancyLabel::from_percent(50.0), OccupancyLabel::HalfFull);
    assert_eq!(OccupancyLabel::from_percent(99.9), OccupancyLabel::HalfFull);
    assert_eq!(OccupancyLabel::from_percent(100.0), OccupancyLabel::Full);
  }

  #[test]
  fn label_for_two_spots() {
    let label = |occupied| OccupancyLabel::from_percent(occupancy_percent(occupied, 2));
    assert_eq!(label(0), OccupancyLabel::Available);
    assert_eq!(label(1), OccupancyLabel::HalfFull);
    assert_eq!(label(2), OccupancyLabel::Full);
  }

  #[test]
  fn empty_facility_is_zero_percent() {
    assert_eq!(occupancy_percent(0, 0), 0.0);
    assert_eq!(
      OccupancyLabel::from_percent(occupancy_percent(0, 0)),
      OccupancyLabel::Available
    );
  }

  #[test]
  fn label_serialises_lowercase() {
    let json = serde_json::to_string(&OccupancyLabel::HalfFull).unwrap();
    assert_eq!(json, "\"halffull\"");
    assert_eq!(OccupancyLabel::HalfFull.as_str(), "halffull");
  }

  #[test]
  fn cents_rounding() {
    assert_eq!(round_cents(0.03 * 7.0), 0.21);
    assert_eq!(round_cents(1.005 + 0.0049), 1.01);
  }
}
