//! [`SqliteStore`]: the SQLite implementation of [`ParkingStore`].

use std::{path::Path, sync::Arc};

use rusqlite::TransactionBehavior;
use uuid::Uuid;

use parkade_core::{
  audit::{self, Violation},
  clock::{Clock, SystemClock},
  event::{EventSeq, NewVehicle, VehicleEvent, VehicleStatus},
  intake,
  ledger::{EventLog, SpotAllocator},
  projector::{StateProjector, StateSnapshot},
  resolver::{CycleOutcome, CycleResolver},
  spot::Spot,
  store::ParkingStore,
};

use crate::{Error, Result, ledger::SqlLedger, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Parkade store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  resolver:        CycleResolver,
  projector:       StateProjector,
  clock:           Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    Ok(Self {
      conn,
      resolver: CycleResolver::default(),
      projector: StateProjector::default(),
      clock: Arc::new(SystemClock),
    })
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

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction. Committed only when
  /// `f` succeeds; otherwise every statement it ran is rolled back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut SqlLedger<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&mut SqlLedger::new(&tx));
        if result.is_ok() {
          tx.commit()?;
        }
        Ok(result)
      })
      .await?
  }

  /// Run `f` inside a read transaction so every query sees the same
  /// database state.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&SqlLedger<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(f(&SqlLedger::new(&tx)))
      })
      .await?
  }
}

impl ParkingStore for SqliteStore {
  type Error = Error;

  async fn provision_spots(&self, capacity: u32) -> Result<Vec<Spot>> {
    let spots = self
      .write(move |ledger| {
        ledger.provision(capacity)?;
        ledger.spots()
      })
      .await?;
    tracing::info!(capacity, total = spots.len(), "spots provisioned");
    Ok(spots)
  }

  async fn advance_cycle(&self) -> Result<CycleOutcome> {
    let resolver = self.resolver.clone();
    let now = self.clock.now();
    self
      .write(move |ledger| resolver.advance(ledger, now))
      .await
      .inspect_err(|e| tracing::warn!(error = %e, "cycle failed, rolled back"))
  }

  async fn admit_vehicle(&self, vehicle: NewVehicle) -> Result<VehicleEvent> {
    let now = self.clock.now();
    self
      .write(move |ledger| intake::admit_vehicle(ledger, vehicle, now))
      .await
  }

  async fn request_departure(&self, vehicle_id: Uuid) -> Result<VehicleEvent> {
    let now = self.clock.now();
    self
      .write(move |ledger| intake::request_departure(ledger, vehicle_id, now))
      .await
  }

  async fn snapshot(&self) -> Result<StateSnapshot> {
    let projector = self.projector;
    self.read(move |ledger| projector.snapshot(ledger)).await
  }

  async fn current_vehicles(&self, status: VehicleStatus) -> Result<Vec<VehicleEvent>> {
    self.read(move |ledger| ledger.current_in(status)).await
  }

  async fn events_since(&self, cursor: Option<EventSeq>, limit: usize) -> Result<Vec<VehicleEvent>> {
    self
      .read(move |ledger| ledger.events_since(cursor, limit))
      .await
  }

  async fn vehicle_timeline(&self, vehicle_id: Uuid) -> Result<Vec<VehicleEvent>> {
    self.read(move |ledger| ledger.timeline(vehicle_id)).await
  }

  async fn audit(&self) -> Result<Vec<Violation>> {
    self.read(|ledger| audit::audit(ledger)).await
  }
}
