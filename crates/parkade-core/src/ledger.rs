//! The synchronous `EventLog` and `SpotAllocator` traits.
//!
//! A ledger is a mutable view over the event table and the spot table. The
//! [`CycleResolver`](crate::resolver::CycleResolver) and
//! [`StateProjector`](crate::projector::StateProjector) are written against
//! these traits only; a backend makes a pass atomic by handing them a ledger
//! scoped to one transaction (SQLite) or one checkpoint (memory).

use uuid::Uuid;

use crate::{
  event::{EventSeq, PendingEvent, VehicleEvent, VehicleStatus},
  spot::Spot,
};

/// Common error plumbing for both halves of a ledger.
pub trait Ledger {
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;
}

// ─── Event log ───────────────────────────────────────────────────────────────

/// Append-only store of vehicle lifecycle events.
///
/// Every "latest"/"earliest" query orders by `(timestamp, seq)`; `seq` is the
/// tie-break when timestamps are equal, so the later insertion wins.
pub trait EventLog: Ledger {
  /// Persist `event`, assigning the next `seq`. The only mutator.
  fn append(&mut self, event: PendingEvent) -> Result<VehicleEvent, Self::Error>;

  /// For each vehicle, its latest event among those whose status is in
  /// `filter` (or among all events when `filter` is `None`). Ordered by
  /// `(timestamp, seq)` ascending.
  fn latest_per_vehicle(
    &self,
    filter: Option<&[VehicleStatus]>,
  ) -> Result<Vec<VehicleEvent>, Self::Error>;

  /// For each vehicle, its earliest event with `status`. Ordered by
  /// `(timestamp, seq)` ascending.
  fn earliest_per_vehicle(
    &self,
    status: VehicleStatus,
  ) -> Result<Vec<VehicleEvent>, Self::Error>;

  /// The current event of one vehicle.
  fn latest_for(&self, vehicle_id: Uuid) -> Result<Option<VehicleEvent>, Self::Error>;

  /// One vehicle's events in chronological order.
  fn timeline(&self, vehicle_id: Uuid) -> Result<Vec<VehicleEvent>, Self::Error>;

  /// Events with `seq > cursor` in insertion order, at most `limit`.
  fn events_since(
    &self,
    cursor: Option<EventSeq>,
    limit: usize,
  ) -> Result<Vec<VehicleEvent>, Self::Error>;

  /// The newest `limit` events, returned oldest first.
  fn recent(&self, limit: usize) -> Result<Vec<VehicleEvent>, Self::Error>;

  /// Vehicles whose current (overall latest) event has `status`.
  ///
  /// Unlike `latest_per_vehicle(Some(&[status]))`, a vehicle that has moved
  /// past `status` is not returned.
  fn current_in(&self, status: VehicleStatus) -> Result<Vec<VehicleEvent>, Self::Error> {
    let mut current = self.latest_per_vehicle(None)?;
    current.retain(|e| e.status == status);
    Ok(current)
  }
}

// ─── Spot allocator ──────────────────────────────────────────────────────────

/// The spot table.
pub trait SpotAllocator: Ledger {
  /// All spots, ascending by number.
  fn spots(&self) -> Result<Vec<Spot>, Self::Error>;

  /// Free spots, ascending by number.
  fn free_spots(&self) -> Result<Vec<Spot>, Self::Error> {
    let mut spots = self.spots()?;
    spots.retain(|s| !s.occupied);
    Ok(spots)
  }

  /// Mark `number` occupied. Fails with
  /// [`Error::SpotOccupied`](crate::Error::SpotOccupied) if it already is.
  fn occupy(&mut self, number: u32) -> Result<(), Self::Error>;

  /// Mark `number` free. Releasing a free spot is a no-op.
  fn release(&mut self, number: u32) -> Result<(), Self::Error>;
}
