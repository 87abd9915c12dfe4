//! The `ParkingStore` trait: the async facade over a ledger backend.
//!
//! Implemented by [`MemoryStore`](crate::memory::MemoryStore) and by storage
//! crates (e.g. `parkade-store-sqlite`). The HTTP layer and the simulator
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  audit::Violation,
  event::{EventSeq, NewVehicle, VehicleEvent, VehicleStatus},
  projector::StateSnapshot,
  resolver::CycleOutcome,
  spot::Spot,
};

/// Abstraction over a Parkade backend.
///
/// Writers (`advance_cycle`, `admit_vehicle`, `request_departure`,
/// `provision_spots`) are serialised by the backend; each is all-or-nothing.
/// Readers see one consistent point in time.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ParkingStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Provisioning ──────────────────────────────────────────────────────

  /// Ensure spots `1..=capacity` exist (existing spots are left untouched)
  /// and return the full spot table.
  fn provision_spots(
    &self,
    capacity: u32,
  ) -> impl Future<Output = Result<Vec<Spot>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Run one two-phase resolution pass.
  fn advance_cycle(
    &self,
  ) -> impl Future<Output = Result<CycleOutcome, Self::Error>> + Send + '_;

  /// Append the initial `Entering` event for a new vehicle.
  fn admit_vehicle(
    &self,
    vehicle: NewVehicle,
  ) -> impl Future<Output = Result<VehicleEvent, Self::Error>> + Send + '_;

  /// Append a `Leaving` event for a vehicle that is currently parked.
  fn request_departure(
    &self,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<VehicleEvent, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<StateSnapshot, Self::Error>> + Send + '_;

  /// Vehicles whose current status is `status`.
  fn current_vehicles(
    &self,
    status: VehicleStatus,
  ) -> impl Future<Output = Result<Vec<VehicleEvent>, Self::Error>> + Send + '_;

  /// Events appended after `cursor`, in insertion order.
  fn events_since(
    &self,
    cursor: Option<EventSeq>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<VehicleEvent>, Self::Error>> + Send + '_;

  /// One vehicle's full history; empty if the vehicle is unknown.
  fn vehicle_timeline(
    &self,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<Vec<VehicleEvent>, Self::Error>> + Send + '_;

  fn audit(
    &self,
  ) -> impl Future<Output = Result<Vec<Violation>, Self::Error>> + Send + '_;
}
