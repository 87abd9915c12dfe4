//! Pluggable selection policies.
//!
//! The resolver asks a [`SpotPolicy`] which free spot an arriving vehicle
//! gets; the traffic generator asks a [`DeparturePolicy`] which parked
//! vehicles leave. Both default to deterministic choices.

use rand::seq::SliceRandom as _;
use uuid::Uuid;

use crate::{event::VehicleEvent, spot::Spot};

// ─── Spot choice ─────────────────────────────────────────────────────────────

pub trait SpotPolicy: Send + Sync {
  /// Pick one spot number from `free` (ascending by number, never empty).
  fn choose(&self, free: &[Spot]) -> Option<u32>;
}

/// Always the lowest-numbered free spot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestFree;

impl SpotPolicy for LowestFree {
  fn choose(&self, free: &[Spot]) -> Option<u32> { free.first().map(|s| s.number) }
}

/// A uniformly random free spot. Non-deterministic; not used by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFree;

impl SpotPolicy for RandomFree {
  fn choose(&self, free: &[Spot]) -> Option<u32> {
    free.choose(&mut rand::thread_rng()).map(|s| s.number)
  }
}

// ─── Departure choice ────────────────────────────────────────────────────────

pub trait DeparturePolicy: Send + Sync {
  /// Pick at most `count` vehicles from `parked` to send to `Leaving`.
  fn select(&self, parked: &[VehicleEvent], count: usize) -> Vec<Uuid>;
}

/// The vehicles that have been parked the longest.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestParked;

impl DeparturePolicy for LongestParked {
  fn select(&self, parked: &[VehicleEvent], count: usize) -> Vec<Uuid> {
    let mut oldest: Vec<&VehicleEvent> = parked.iter().collect();
    oldest.sort_by_key(|e| (e.timestamp, e.seq));
    oldest.into_iter().take(count).map(|e| e.vehicle_id).collect()
  }
}

/// A random sample of the parked vehicles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDepartures;

impl DeparturePolicy for RandomDepartures {
  fn select(&self, parked: &[VehicleEvent], count: usize) -> Vec<Uuid> {
    parked
      .choose_multiple(&mut rand::thread_rng(), count)
      .map(|e| e.vehicle_id)
      .collect()
  }
}
