//! Consistency checks between the spot table and the event log.
//!
//! A healthy ledger has exactly one holding vehicle per occupied spot (parked,
//! or leaving and not yet released), no holder on a free spot, and only valid
//! status sequences.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  event::{VehicleEvent, VehicleStatus},
  ledger::{EventLog, SpotAllocator},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
  /// Spot is marked occupied but no vehicle holds it.
  OrphanedSpot { spot: u32 },
  /// A vehicle holds a spot marked free.
  FreeSpotInUse { spot: u32, vehicle_id: Uuid },
  /// More than one vehicle holds the same spot.
  DoubleBooked { spot: u32, vehicles: Vec<Uuid> },
  /// A vehicle holds a spot that was never provisioned.
  UnknownSpot { spot: u32, vehicle_id: Uuid },
  /// The vehicle's statuses are not a prefix of a valid visit.
  InvalidTimeline {
    vehicle_id: Uuid,
    statuses:   Vec<VehicleStatus>,
  },
}

/// Check every invariant and return the violations found (empty when
/// healthy).
pub fn audit<L>(ledger: &L) -> Result<Vec<Violation>, L::Error>
where
  L: EventLog + SpotAllocator,
{
  let mut violations = Vec::new();

  // ── Spots vs. parked vehicles ───────────────────────────────────────────
  let spots = ledger.spots()?;
  let parked_on: HashMap<Uuid, u32> = ledger
    .latest_per_vehicle(Some(&[VehicleStatus::Parked]))?
    .into_iter()
    .filter_map(|e| e.spot.map(|spot| (e.vehicle_id, spot)))
    .collect();

  // A vehicle holds its spot while parked and while leaving, until the
  // resolver releases it.
  let mut holders: BTreeMap<u32, Vec<Uuid>> = BTreeMap::new();
  for event in ledger.latest_per_vehicle(None)? {
    let held = match event.status {
      VehicleStatus::Parked => event.spot,
      VehicleStatus::Leaving => parked_on.get(&event.vehicle_id).copied(),
      _ => None,
    };
    if let Some(spot) = held {
      holders.entry(spot).or_default().push(event.vehicle_id);
    }
  }

  for spot in &spots {
    match (spot.occupied, holders.remove(&spot.number)) {
      (true, None) => violations.push(Violation::OrphanedSpot { spot: spot.number }),
      (false, Some(vehicles)) => {
        for vehicle_id in vehicles {
          violations.push(Violation::FreeSpotInUse { spot: spot.number, vehicle_id });
        }
      }
      (true, Some(vehicles)) if vehicles.len() > 1 => {
        violations.push(Violation::DoubleBooked { spot: spot.number, vehicles });
      }
      _ => {}
    }
  }
  for (spot, vehicles) in holders {
    for vehicle_id in vehicles {
      violations.push(Violation::UnknownSpot { spot, vehicle_id });
    }
  }

  // ── Timelines ───────────────────────────────────────────────────────────
  let mut timelines: HashMap<Uuid, Vec<VehicleEvent>> = HashMap::new();
  for event in ledger.events_since(None, usize::MAX)? {
    timelines.entry(event.vehicle_id).or_default().push(event);
  }

  let mut invalid: Vec<(Uuid, Vec<VehicleStatus>)> = timelines
    .into_iter()
    .map(|(vehicle_id, mut events)| {
      events.sort_by_key(|e| (e.timestamp, e.seq));
      (vehicle_id, events.iter().map(|e| e.status).collect::<Vec<_>>())
    })
    .filter(|(_, statuses)| !is_valid_timeline(statuses))
    .collect();
  invalid.sort();
  violations.extend(
    invalid
      .into_iter()
      .map(|(vehicle_id, statuses)| Violation::InvalidTimeline { vehicle_id, statuses }),
  );

  Ok(violations)
}

/// Whether `statuses` is a prefix of `Entering → Parked → Leaving → HasLeft`
/// or `Entering → Leaving → HasLeft`.
pub fn is_valid_timeline(statuses: &[VehicleStatus]) -> bool {
  match statuses.first() {
    None => true,
    Some(VehicleStatus::Entering) => {
      statuses.windows(2).all(|pair| pair[0].can_advance_to(pair[1]))
    }
    Some(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::VehicleStatus::*;

  #[test]
  fn valid_timelines() {
    assert!(is_valid_timeline(&[]));
    assert!(is_valid_timeline(&[Entering]));
    assert!(is_valid_timeline(&[Entering, Parked, Leaving, HasLeft]));
    assert!(is_valid_timeline(&[Entering, Leaving, HasLeft]));
  }

  #[test]
  fn invalid_timelines() {
    assert!(!is_valid_timeline(&[Parked]));
    assert!(!is_valid_timeline(&[Entering, HasLeft]));
    assert!(!is_valid_timeline(&[Entering, Parked, Parked]));
    assert!(!is_valid_timeline(&[Entering, Leaving, HasLeft, Entering]));
  }
}
