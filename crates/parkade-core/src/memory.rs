//! In-process backend: [`MemoryLedger`] and the [`MemoryStore`] built on it.
//!
//! The ledger is a plain owned value; whoever creates it owns its lifecycle.
//! The store wraps it in a `tokio` read/write lock so a cycle pass has a
//! single writer and snapshots never observe a half-applied pass.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::{self, Violation},
  clock::{Clock, SystemClock},
  event::{EventSeq, NewVehicle, PendingEvent, VehicleEvent, VehicleStatus},
  intake,
  ledger::{EventLog, Ledger, SpotAllocator},
  projector::{StateProjector, StateSnapshot},
  resolver::{CycleOutcome, CycleResolver},
  spot::Spot,
  store::ParkingStore,
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Events and spots held in memory. Cloning copies the whole ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
  events:   Vec<VehicleEvent>,
  spots:    BTreeMap<u32, bool>,
  next_seq: EventSeq,
}

/// State captured by [`MemoryLedger::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
  events:   usize,
  spots:    BTreeMap<u32, bool>,
  next_seq: EventSeq,
}

impl Default for MemoryLedger {
  fn default() -> Self {
    Self { events: Vec::new(), spots: BTreeMap::new(), next_seq: 1 }
  }
}

fn order_key(event: &VehicleEvent) -> (DateTime<Utc>, EventSeq) {
  (event.timestamp, event.seq)
}

impl MemoryLedger {
  /// A ledger with spots `1..=capacity`, all free.
  pub fn with_capacity(capacity: u32) -> Self {
    let mut ledger = Self::default();
    ledger.provision(capacity);
    ledger
  }

  /// Get-or-create spots `1..=capacity`; returns the whole spot table.
  pub fn provision(&mut self, capacity: u32) -> Vec<Spot> {
    for number in 1..=capacity {
      self.spots.entry(number).or_insert(false);
    }
    self.spot_list()
  }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn checkpoint(&self) -> Checkpoint {
    Checkpoint {
      events:   self.events.len(),
      spots:    self.spots.clone(),
      next_seq: self.next_seq,
    }
  }

  /// Discard everything appended or flipped since `checkpoint`.
  pub fn rollback(&mut self, checkpoint: Checkpoint) {
    self.events.truncate(checkpoint.events);
    self.spots = checkpoint.spots;
    self.next_seq = checkpoint.next_seq;
  }

  fn spot_list(&self) -> Vec<Spot> {
    self
      .spots
      .iter()
      .map(|(&number, &occupied)| Spot { number, occupied })
      .collect()
  }

  fn pick_per_vehicle<'a>(
    events: impl Iterator<Item = &'a VehicleEvent>,
    prefer_later: bool,
  ) -> Vec<VehicleEvent> {
    let mut picked: HashMap<Uuid, &VehicleEvent> = HashMap::new();
    for event in events {
      picked
        .entry(event.vehicle_id)
        .and_modify(|current| {
          let later = order_key(event) > order_key(current);
          if later == prefer_later {
            *current = event;
          }
        })
        .or_insert(event);
    }
    let mut picked: Vec<VehicleEvent> = picked.into_values().cloned().collect();
    picked.sort_by_key(order_key);
    picked
  }
}

impl Ledger for MemoryLedger {
  type Error = Error;
}

impl EventLog for MemoryLedger {
  fn append(&mut self, event: PendingEvent) -> Result<VehicleEvent> {
    let event = event.into_event(self.next_seq);
    self.next_seq += 1;
    self.events.push(event.clone());
    Ok(event)
  }

  fn latest_per_vehicle(&self, filter: Option<&[VehicleStatus]>) -> Result<Vec<VehicleEvent>> {
    let matching = self
      .events
      .iter()
      .filter(|e| filter.is_none_or(|statuses| statuses.contains(&e.status)));
    Ok(Self::pick_per_vehicle(matching, true))
  }

  fn earliest_per_vehicle(&self, status: VehicleStatus) -> Result<Vec<VehicleEvent>> {
    let matching = self.events.iter().filter(|e| e.status == status);
    Ok(Self::pick_per_vehicle(matching, false))
  }

  fn latest_for(&self, vehicle_id: Uuid) -> Result<Option<VehicleEvent>> {
    Ok(
      self
        .events
        .iter()
        .filter(|e| e.vehicle_id == vehicle_id)
        .max_by_key(|e| order_key(e))
        .cloned(),
    )
  }

  fn timeline(&self, vehicle_id: Uuid) -> Result<Vec<VehicleEvent>> {
    let mut events: Vec<VehicleEvent> = self
      .events
      .iter()
      .filter(|e| e.vehicle_id == vehicle_id)
      .cloned()
      .collect();
    events.sort_by_key(order_key);
    Ok(events)
  }

  fn events_since(&self, cursor: Option<EventSeq>, limit: usize) -> Result<Vec<VehicleEvent>> {
    let cursor = cursor.unwrap_or(0);
    Ok(
      self
        .events
        .iter()
        .filter(|e| e.seq > cursor)
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  fn recent(&self, limit: usize) -> Result<Vec<VehicleEvent>> {
    let mut newest: Vec<&VehicleEvent> = self.events.iter().collect();
    newest.sort_by_key(|e| std::cmp::Reverse(order_key(e)));
    newest.truncate(limit);
    Ok(newest.into_iter().rev().cloned().collect())
  }
}

impl SpotAllocator for MemoryLedger {
  fn spots(&self) -> Result<Vec<Spot>> { Ok(self.spot_list()) }

  fn occupy(&mut self, number: u32) -> Result<()> {
    match self.spots.get_mut(&number) {
      None => Err(Error::UnknownSpot(number)),
      Some(true) => Err(Error::SpotOccupied(number)),
      Some(occupied) => {
        *occupied = true;
        Ok(())
      }
    }
  }

  fn release(&mut self, number: u32) -> Result<()> {
    let occupied = self
      .spots
      .get_mut(&number)
      .ok_or(Error::UnknownSpot(number))?;
    *occupied = false;
    Ok(())
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A [`ParkingStore`] over a [`MemoryLedger`].
///
/// Cloning is cheap; clones share the same ledger.
#[derive(Clone)]
pub struct MemoryStore {
  ledger:    Arc<RwLock<MemoryLedger>>,
  resolver:  CycleResolver,
  projector: StateProjector,
  clock:     Arc<dyn Clock>,
}

impl MemoryStore {
  /// A store with `capacity` free spots, lowest-free spot assignment and the
  /// system clock.
  pub fn new(capacity: u32) -> Self {
    Self::from_ledger(MemoryLedger::with_capacity(capacity))
  }

  pub fn from_ledger(ledger: MemoryLedger) -> Self {
    Self {
      ledger:    Arc::new(RwLock::new(ledger)),
      resolver:  CycleResolver::default(),
      projector: StateProjector::default(),
      clock:     Arc::new(SystemClock),
    }
  }

  pub fn with_resolver(mut self, resolver: CycleResolver) -> Self {
    self.resolver = resolver;
    self
  }

  pub fn with_projector(mut self, projector: StateProjector) -> Self {
    self.projector = projector;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }
}

impl ParkingStore for MemoryStore {
  type Error = Error;

  async fn provision_spots(&self, capacity: u32) -> Result<Vec<Spot>> {
    let spots = self.ledger.write().await.provision(capacity);
    tracing::info!(capacity, total = spots.len(), "spots provisioned");
    Ok(spots)
  }

  async fn advance_cycle(&self) -> Result<CycleOutcome> {
    let mut ledger = self.ledger.write().await;
    let now = self.clock.now();
    let checkpoint = ledger.checkpoint();
    match self.resolver.advance(&mut *ledger, now) {
      Ok(outcome) => Ok(outcome),
      Err(e) => {
        tracing::warn!(error = %e, "cycle failed, rolling back");
        ledger.rollback(checkpoint);
        Err(e)
      }
    }
  }

  async fn admit_vehicle(&self, vehicle: NewVehicle) -> Result<VehicleEvent> {
    let mut ledger = self.ledger.write().await;
    let now = self.clock.now();
    intake::admit_vehicle(&mut *ledger, vehicle, now)
  }

  async fn request_departure(&self, vehicle_id: Uuid) -> Result<VehicleEvent> {
    let mut ledger = self.ledger.write().await;
    let now = self.clock.now();
    intake::request_departure(&mut *ledger, vehicle_id, now)
  }

  async fn snapshot(&self) -> Result<StateSnapshot> {
    let ledger = self.ledger.read().await;
    self.projector.snapshot(&*ledger)
  }

  async fn current_vehicles(&self, status: VehicleStatus) -> Result<Vec<VehicleEvent>> {
    self.ledger.read().await.current_in(status)
  }

  async fn events_since(&self, cursor: Option<EventSeq>, limit: usize) -> Result<Vec<VehicleEvent>> {
    self.ledger.read().await.events_since(cursor, limit)
  }

  async fn vehicle_timeline(&self, vehicle_id: Uuid) -> Result<Vec<VehicleEvent>> {
    self.ledger.read().await.timeline(vehicle_id)
  }

  async fn audit(&self) -> Result<Vec<Violation>> {
    audit::audit(&*self.ledger.read().await)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Classify, ErrorClass};

  #[test]
  fn release_is_idempotent_and_rejects_unknown_spots() {
    let mut ledger = MemoryLedger::with_capacity(2);

    ledger.release(1).unwrap();
    ledger.release(1).unwrap();
    assert_eq!(ledger.free_spots().unwrap().len(), 2);

    ledger.occupy(1).unwrap();
    assert!(matches!(ledger.occupy(1), Err(Error::SpotOccupied(1))));
    ledger.release(1).unwrap();
    ledger.release(1).unwrap();
    assert_eq!(ledger.spots().unwrap()[0], Spot { number: 1, occupied: false });

    let err = ledger.release(99).unwrap_err();
    assert!(matches!(err, Error::UnknownSpot(99)));
    assert_eq!(err.class(), ErrorClass::Allocation);
    assert!(matches!(ledger.occupy(99), Err(Error::UnknownSpot(99))));
  }
}
