//! The cycle resolver: advances every pending vehicle by one step.
//!
//! A pass runs two phases over batches captured when the pass starts:
//!
//! 1. every vehicle currently `Entering` is parked on a free spot, or turned
//!    away to `Leaving` when none is left;
//! 2. every vehicle currently `Leaving` releases its spot (if it ever held
//!    one) and moves to `HasLeft`.
//!
//! Because both batches and the free-spot list are read up front, a vehicle
//! moves at most once per pass and a spot freed in phase 2 is only offered to
//! arrivals on the next pass.
//!
//! The resolver never creates `Entering` events and never sends a parked
//! vehicle to `Leaving`; those decisions belong to intake and traffic.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  event::VehicleStatus,
  ledger::{EventLog, SpotAllocator},
  policy::{LowestFree, SpotPolicy},
};

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
  /// Vehicles moved out of `Entering` (`parked + turned_away`).
  pub entering_resolved: usize,
  /// Vehicles moved from `Leaving` to `HasLeft`.
  pub leaving_resolved:  usize,
  pub parked:            usize,
  /// Arrivals that found no free spot.
  pub turned_away:       usize,
}

/// Runs resolution passes against any ledger.
///
/// Cloning is cheap; the spot policy is shared.
#[derive(Clone)]
pub struct CycleResolver {
  policy: Arc<dyn SpotPolicy>,
}

impl Default for CycleResolver {
  fn default() -> Self { Self::new(LowestFree) }
}

impl std::fmt::Debug for CycleResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CycleResolver").finish_non_exhaustive()
  }
}

impl CycleResolver {
  pub fn new(policy: impl SpotPolicy + 'static) -> Self {
    Self { policy: Arc::new(policy) }
  }

  /// Run one pass. Every event appended by the pass is stamped `now`
  /// (clamped per vehicle so it never sorts before that vehicle's previous
  /// event).
  ///
  /// The pass is not atomic by itself: callers must run it inside a
  /// transaction or checkpoint and discard the ledger's changes on error.
  pub fn advance<L>(&self, ledger: &mut L, now: DateTime<Utc>) -> Result<CycleOutcome, L::Error>
  where
    L: EventLog + SpotAllocator,
  {
    let current = ledger.latest_per_vehicle(None)?;
    let mut free = ledger.free_spots()?;

    let (entering, leaving): (Vec<_>, Vec<_>) = current
      .into_iter()
      .filter(|e| matches!(e.status, VehicleStatus::Entering | VehicleStatus::Leaving))
      .partition(|e| e.status == VehicleStatus::Entering);

    let mut outcome = CycleOutcome::default();

    // ── Phase 1: arrivals ────────────────────────────────────────────────
    for arrival in &entering {
      let chosen = if free.is_empty() { None } else { self.policy.choose(&free) };

      let next = match chosen {
        Some(number) => {
          if let Err(e) = ledger.occupy(number) {
            tracing::error!(
              vehicle = %arrival.vehicle_id,
              spot = number,
              error = %e,
              "spot allocation failed",
            );
            return Err(e);
          }
          free.retain(|s| s.number != number);
          outcome.parked += 1;
          tracing::debug!(vehicle = %arrival.vehicle_id, spot = number, "vehicle parked");
          arrival.successor(VehicleStatus::Parked, Some(number), now)?
        }
        None => {
          outcome.turned_away += 1;
          tracing::debug!(vehicle = %arrival.vehicle_id, "no free spot, vehicle turned away");
          arrival.successor(VehicleStatus::Leaving, None, now)?
        }
      };

      ledger.append(next)?;
      outcome.entering_resolved += 1;
    }

    // ── Phase 2: departures ──────────────────────────────────────────────
    if !leaving.is_empty() {
      let held: HashMap<Uuid, u32> = ledger
        .latest_per_vehicle(Some(&[VehicleStatus::Parked]))?
        .into_iter()
        .filter_map(|e| e.spot.map(|spot| (e.vehicle_id, spot)))
        .collect();

      for departure in &leaving {
        if let Some(&number) = held.get(&departure.vehicle_id) {
          ledger.release(number)?;
          tracing::debug!(vehicle = %departure.vehicle_id, spot = number, "spot released");
        }
        ledger.append(departure.successor(VehicleStatus::HasLeft, None, now)?)?;
        outcome.leaving_resolved += 1;
      }
    }

    tracing::info!(
      entering = outcome.entering_resolved,
      parked = outcome.parked,
      turned_away = outcome.turned_away,
      leaving = outcome.leaving_resolved,
      "cycle resolved",
    );

    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::{
    Error,
    event::NewVehicle,
    intake,
    ledger::EventLog,
    memory::MemoryLedger,
    spot::Spot,
  };

  fn admit(ledger: &mut MemoryLedger, plate: &str, at: DateTime<Utc>) -> Uuid {
    intake::admit_vehicle(ledger, NewVehicle::new(plate), at)
      .unwrap()
      .vehicle_id
  }

  fn status_of(ledger: &MemoryLedger, id: Uuid) -> VehicleStatus {
    ledger.latest_for(id).unwrap().unwrap().status
  }

  #[test]
  fn arrivals_take_lowest_free_spots_in_order() {
    let mut ledger = MemoryLedger::with_capacity(3);
    let now = Utc::now();
    let a = admit(&mut ledger, "AAA-001", now);
    let b = admit(&mut ledger, "BBB-002", now);

    let outcome = CycleResolver::default().advance(&mut ledger, now).unwrap();
    assert_eq!(outcome.parked, 2);
    assert_eq!(outcome.entering_resolved, 2);

    assert_eq!(ledger.latest_for(a).unwrap().unwrap().spot, Some(1));
    assert_eq!(ledger.latest_for(b).unwrap().unwrap().spot, Some(2));
    assert_eq!(
      ledger.spots().unwrap(),
      vec![
        Spot { number: 1, occupied: true },
        Spot { number: 2, occupied: true },
        Spot { number: 3, occupied: false },
      ]
    );
  }

  #[test]
  fn full_facility_turns_arrivals_away() {
    let mut ledger = MemoryLedger::with_capacity(1);
    let now = Utc::now();
    let a = admit(&mut ledger, "AAA-001", now);
    let b = admit(&mut ledger, "BBB-002", now);

    let outcome = CycleResolver::default().advance(&mut ledger, now).unwrap();
    assert_eq!(outcome.parked, 1);
    assert_eq!(outcome.turned_away, 1);
    assert_eq!(outcome.leaving_resolved, 0);
    assert_eq!(status_of(&ledger, a), VehicleStatus::Parked);

    // Turned away, not yet gone: one transition per pass.
    let b_now = ledger.latest_for(b).unwrap().unwrap();
    assert_eq!(b_now.status, VehicleStatus::Leaving);
    assert_eq!(b_now.spot, None);

    CycleResolver::default().advance(&mut ledger, now).unwrap();
    assert_eq!(status_of(&ledger, b), VehicleStatus::HasLeft);
    assert_eq!(status_of(&ledger, a), VehicleStatus::Parked);
  }

  #[test]
  fn spot_freed_in_a_pass_is_not_reused_in_the_same_pass() {
    let mut ledger = MemoryLedger::with_capacity(1);
    let resolver = CycleResolver::default();
    let now = Utc::now();

    let a = admit(&mut ledger, "AAA-001", now);
    resolver.advance(&mut ledger, now).unwrap();
    intake::request_departure(&mut ledger, a, now).unwrap();
    let b = admit(&mut ledger, "BBB-002", now);

    let outcome = resolver.advance(&mut ledger, now).unwrap();
    assert_eq!(outcome.turned_away, 1);
    assert_eq!(outcome.leaving_resolved, 1);
    assert_eq!(status_of(&ledger, a), VehicleStatus::HasLeft);
    assert_eq!(status_of(&ledger, b), VehicleStatus::Leaving);
    assert_eq!(ledger.free_spots().unwrap().len(), 1);
  }

  #[test]
  fn pass_with_nothing_pending_appends_nothing() {
    let mut ledger = MemoryLedger::with_capacity(2);
    let now = Utc::now();
    admit(&mut ledger, "AAA-001", now);
    let resolver = CycleResolver::default();
    resolver.advance(&mut ledger, now).unwrap();

    let before = ledger.len();
    let outcome = resolver.advance(&mut ledger, now).unwrap();
    assert_eq!(outcome, CycleOutcome::default());
    assert_eq!(ledger.len(), before);
  }

  #[test]
  fn events_are_stamped_with_the_pass_time() {
    let mut ledger = MemoryLedger::with_capacity(1);
    let start = Utc::now();
    let a = admit(&mut ledger, "AAA-001", start);

    let later = start + Duration::seconds(30);
    CycleResolver::default().advance(&mut ledger, later).unwrap();
    assert_eq!(ledger.latest_for(a).unwrap().unwrap().timestamp, later);

    // A clock that went backwards never reorders a vehicle's timeline.
    intake::request_departure(&mut ledger, a, start).unwrap();
    let timeline = ledger.timeline(a).unwrap();
    let statuses: Vec<_> = timeline.iter().map(|e| e.status).collect();
    assert_eq!(
      statuses,
      vec![VehicleStatus::Entering, VehicleStatus::Parked, VehicleStatus::Leaving]
    );
  }

  struct AlwaysSpotOne;

  impl SpotPolicy for AlwaysSpotOne {
    fn choose(&self, _free: &[Spot]) -> Option<u32> { Some(1) }
  }

  #[test]
  fn misbehaving_policy_surfaces_an_allocation_error() {
    let mut ledger = MemoryLedger::with_capacity(2);
    let now = Utc::now();
    admit(&mut ledger, "AAA-001", now);
    admit(&mut ledger, "BBB-002", now);

    let err = CycleResolver::new(AlwaysSpotOne)
      .advance(&mut ledger, now)
      .unwrap_err();
    assert!(matches!(err, Error::SpotOccupied(1)));
  }
}
