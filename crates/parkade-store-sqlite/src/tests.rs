//! Integration tests for `SqliteStore` against in-memory and on-disk
//! databases.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use parkade_core::{
  Classify, ErrorClass,
  clock::ManualClock,
  event::{NewVehicle, VehicleStatus},
  ledger::SpotAllocator,
  policy::SpotPolicy,
  projector::OccupancyLabel,
  resolver::CycleResolver,
  spot::Spot,
  store::ParkingStore,
  traffic::{RandomTraffic, run_cycle},
};
use uuid::Uuid;

use crate::{Error, SqlLedger, SqliteStore};

async fn store(capacity: u32) -> (SqliteStore, Arc<ManualClock>) {
  let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()));
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
    .with_clock(clock.clone());
  store.provision_spots(capacity).await.unwrap();
  (store, clock)
}

fn car(plate: &str) -> NewVehicle {
  NewVehicle {
    license_plate: plate.to_owned(),
    model:         Some("Corolla".to_owned()),
    color:         Some("Silver".to_owned()),
    year:          Some(2021),
  }
}

// ─── Spots ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn provisioning_creates_free_spots_once() {
  let (s, _clock) = store(3).await;

  let spots = s.provision_spots(3).await.unwrap();
  assert_eq!(
    spots,
    vec![
      Spot { number: 1, occupied: false },
      Spot { number: 2, occupied: false },
      Spot { number: 3, occupied: false },
    ]
  );
  assert_eq!(s.provision_spots(1).await.unwrap().len(), 3);
}

#[tokio::test]
async fn release_is_idempotent_and_rejects_unknown_spots() {
  let (s, _clock) = store(2).await;

  let (first, second, occupied_twice, unknown_release, unknown_occupy) = s
    .conn
    .call(|conn| {
      let mut ledger = SqlLedger::new(conn);
      let first = ledger.release(1);
      let second = ledger.release(1);
      let occupied_twice = ledger.occupy(1).and_then(|()| ledger.occupy(1));
      let _ = ledger.release(1);
      let unknown_release = ledger.release(99);
      let unknown_occupy = ledger.occupy(99);
      Ok((first, second, occupied_twice, unknown_release, unknown_occupy))
    })
    .await
    .unwrap();

  assert!(first.is_ok() && second.is_ok());
  assert!(matches!(
    occupied_twice,
    Err(Error::Core(parkade_core::Error::SpotOccupied(1)))
  ));

  let err = unknown_release.unwrap_err();
  assert!(matches!(err, Error::Core(parkade_core::Error::UnknownSpot(99))));
  assert_eq!(err.class(), ErrorClass::Allocation);
  assert!(matches!(
    unknown_occupy,
    Err(Error::Core(parkade_core::Error::UnknownSpot(99)))
  ));

  let spots = s.snapshot().await.unwrap().spots;
  assert!(spots.iter().all(|sp| !sp.occupied));
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_spot_walkthrough() {
  let (s, clock) = store(2).await;

  let a = s.admit_vehicle(car("AAA-001")).await.unwrap();
  let b = s.admit_vehicle(car("BBB-002")).await.unwrap();
  let c = s.admit_vehicle(car("CCC-003")).await.unwrap();
  assert!(a.seq < b.seq && b.seq < c.seq);

  clock.advance(Duration::seconds(1));
  let outcome = s.advance_cycle().await.unwrap();
  assert_eq!(outcome.parked, 2);
  assert_eq!(outcome.turned_away, 1);

  let snapshot = s.snapshot().await.unwrap();
  assert_eq!(snapshot.occupancy_label, OccupancyLabel::Full);
  let placed: Vec<_> = snapshot.parked.iter().map(|e| (e.vehicle_id, e.spot)).collect();
  assert!(placed.contains(&(a.vehicle_id, Some(1))));
  assert!(placed.contains(&(b.vehicle_id, Some(2))));
  assert_eq!(snapshot.leaving.len(), 1);
  assert_eq!(snapshot.leaving[0].vehicle_id, c.vehicle_id);

  s.request_departure(a.vehicle_id).await.unwrap();
  clock.advance(Duration::seconds(1));
  let outcome = s.advance_cycle().await.unwrap();
  assert_eq!(outcome.leaving_resolved, 2);

  let snapshot = s.snapshot().await.unwrap();
  assert_eq!(snapshot.counts.has_left, 2);
  assert_eq!(snapshot.occupancy_percent, 50.0);
  assert_eq!(snapshot.occupancy_label, OccupancyLabel::HalfFull);
  assert_eq!(snapshot.spots[0], Spot { number: 1, occupied: false });
  assert_eq!(snapshot.finished_sessions.len(), 2);
  assert_eq!(snapshot.counts.total_cash, 0.12);
  assert!(s.audit().await.unwrap().is_empty());
}

#[tokio::test]
async fn events_round_trip_through_sqlite() {
  let (s, _clock) = store(1).await;
  let admitted = s.admit_vehicle(car("  XYZ-999 ")).await.unwrap();
  s.advance_cycle().await.unwrap();

  let timeline = s.vehicle_timeline(admitted.vehicle_id).await.unwrap();
  assert_eq!(timeline.len(), 2);
  assert_eq!(timeline[0], admitted);
  assert_eq!(timeline[0].vehicle.license_plate, "XYZ-999");
  assert_eq!(timeline[1].status, VehicleStatus::Parked);
  assert_eq!(timeline[1].spot, Some(1));
  assert_eq!(timeline[1].vehicle, admitted.vehicle);
}

#[tokio::test]
async fn equal_timestamps_are_ordered_by_insertion() {
  let (s, _clock) = store(1).await;

  // The clock never moves, so every event shares one timestamp.
  let a = s.admit_vehicle(car("AAA-001")).await.unwrap();
  s.advance_cycle().await.unwrap();
  s.request_departure(a.vehicle_id).await.unwrap();
  s.advance_cycle().await.unwrap();

  let statuses: Vec<_> = s
    .vehicle_timeline(a.vehicle_id)
    .await
    .unwrap()
    .iter()
    .map(|e| e.status)
    .collect();
  assert_eq!(
    statuses,
    vec![
      VehicleStatus::Entering,
      VehicleStatus::Parked,
      VehicleStatus::Leaving,
      VehicleStatus::HasLeft,
    ]
  );
  assert!(s.current_vehicles(VehicleStatus::Parked).await.unwrap().is_empty());
}

#[tokio::test]
async fn departed_vehicles_are_not_parked_again() {
  let (s, _clock) = store(2).await;
  let a = s.admit_vehicle(car("AAA-001")).await.unwrap();
  s.advance_cycle().await.unwrap();
  s.request_departure(a.vehicle_id).await.unwrap();
  s.advance_cycle().await.unwrap();

  let outcome = s.advance_cycle().await.unwrap();
  assert_eq!(outcome.entering_resolved, 0);
  assert_eq!(outcome.leaving_resolved, 0);
}

// ─── Atomicity ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_pass_is_rolled_back() {
  let (s, _clock) = store(1).await;
  let a = s.admit_vehicle(car("AAA-001")).await.unwrap();
  s.advance_cycle().await.unwrap();
  s.request_departure(a.vehicle_id).await.unwrap();
  s.admit_vehicle(car("BBB-002")).await.unwrap();

  // Fail the pass at its very last insert, after the spot release.
  s.conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER fail_departure BEFORE INSERT ON vehicle_events
         WHEN NEW.status = 'has_left'
         BEGIN SELECT RAISE(ABORT, 'boom'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let before = s.events_since(None, 100).await.unwrap();
  let err = s.advance_cycle().await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Storage);

  let after = s.events_since(None, 100).await.unwrap();
  assert_eq!(before, after);
  let spots = s.snapshot().await.unwrap().spots;
  assert_eq!(spots, vec![Spot { number: 1, occupied: true }]);
  assert!(s.audit().await.unwrap().is_empty());
}

/// Hands out one fixed spot number whatever is free.
struct FixedSpot(u32);

impl SpotPolicy for FixedSpot {
  fn choose(&self, _free: &[Spot]) -> Option<u32> { Some(self.0) }
}

#[tokio::test]
async fn double_allocation_is_rejected_and_rolled_back() {
  let (s, _clock) = store(2).await;
  let s = s.with_resolver(CycleResolver::new(FixedSpot(1)));
  s.admit_vehicle(car("AAA-001")).await.unwrap();
  s.admit_vehicle(car("BBB-002")).await.unwrap();
  let before = s.events_since(None, 100).await.unwrap();

  let err = s.advance_cycle().await.unwrap_err();
  assert!(matches!(err, Error::Core(parkade_core::Error::SpotOccupied(1))));
  assert_eq!(err.class(), ErrorClass::Allocation);

  assert_eq!(s.events_since(None, 100).await.unwrap(), before);
  let spots = s.snapshot().await.unwrap().spots;
  assert!(spots.iter().all(|sp| !sp.occupied));
  assert!(s.audit().await.unwrap().is_empty());
}

#[tokio::test]
async fn allocation_of_an_unprovisioned_spot_is_rejected() {
  let (s, _clock) = store(2).await;
  let s = s.with_resolver(CycleResolver::new(FixedSpot(99)));
  s.admit_vehicle(car("AAA-001")).await.unwrap();

  let err = s.advance_cycle().await.unwrap_err();
  assert!(matches!(err, Error::Core(parkade_core::Error::UnknownSpot(99))));
  assert_eq!(err.class(), ErrorClass::Allocation);
  assert_eq!(s.events_since(None, 100).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_never_share_a_spot() {
  let (s, _clock) = store(3).await;

  let mut tasks = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    tasks.push(tokio::spawn(async move {
      for j in 0..5 {
        s.admit_vehicle(car(&format!("T{i}-{j:03}"))).await.unwrap();
        s.advance_cycle().await.unwrap();
      }
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  assert!(s.audit().await.unwrap().is_empty());
  let snapshot = s.snapshot().await.unwrap();
  let occupied = snapshot.spots.iter().filter(|sp| sp.occupied).count();
  assert_eq!(snapshot.counts.parked, 3);
  assert_eq!(occupied, snapshot.counts.parked);

  let mut taken: Vec<_> = snapshot.parked.iter().filter_map(|e| e.spot).collect();
  taken.sort_unstable();
  taken.dedup();
  assert_eq!(taken.len(), 3);
}

#[tokio::test]
async fn event_log_rejects_updates_and_deletes() {
  let (s, _clock) = store(1).await;
  s.admit_vehicle(car("AAA-001")).await.unwrap();

  let update = s
    .conn
    .call(|conn| Ok(conn.execute("UPDATE vehicle_events SET status = 'parked'", [])))
    .await
    .unwrap();
  assert!(update.is_err());

  let delete = s
    .conn
    .call(|conn| Ok(conn.execute("DELETE FROM vehicle_events", [])))
    .await
    .unwrap();
  assert!(delete.is_err());

  assert_eq!(s.events_since(None, 10).await.unwrap().len(), 1);
}

// ─── Rejections ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn core_errors_keep_their_class() {
  let (s, _clock) = store(1).await;

  let err = s.admit_vehicle(car("")).await.unwrap_err();
  assert!(matches!(err, Error::Core(parkade_core::Error::InvalidVehicle(_))));
  assert_eq!(err.class(), ErrorClass::Validation);

  let err = s.request_departure(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::NotFound);
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn state_survives_reopen() {
  let path = std::env::temp_dir().join(format!("parkade-{}.db", Uuid::new_v4()));

  let vehicle_id = {
    let s = SqliteStore::open(&path).await.unwrap();
    s.provision_spots(2).await.unwrap();
    let a = s.admit_vehicle(car("AAA-001")).await.unwrap();
    s.advance_cycle().await.unwrap();
    a.vehicle_id
  };

  let s = SqliteStore::open(&path).await.unwrap();
  let snapshot = s.snapshot().await.unwrap();
  assert_eq!(snapshot.spots.len(), 2);
  assert_eq!(snapshot.parked.len(), 1);
  assert_eq!(snapshot.parked[0].vehicle_id, vehicle_id);

  drop(s);
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}

// ─── Traffic ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn simulated_traffic_keeps_the_ledger_consistent() {
  let (s, clock) = store(3).await;
  let traffic = RandomTraffic::default();

  for _ in 0..30 {
    clock.advance(Duration::seconds(5));
    run_cycle(&s, Some(&traffic)).await.unwrap();
  }

  assert!(s.audit().await.unwrap().is_empty());
  let snapshot = s.snapshot().await.unwrap();
  assert_eq!(
    snapshot.spots.iter().filter(|sp| sp.occupied).count(),
    snapshot.counts.parked + holding_while_leaving(&s).await
  );
}

/// Leaving vehicles that still hold the spot they parked on.
async fn holding_while_leaving(s: &SqliteStore) -> usize {
  let mut holding = 0;
  for leaving in s.current_vehicles(VehicleStatus::Leaving).await.unwrap() {
    let timeline = s.vehicle_timeline(leaving.vehicle_id).await.unwrap();
    if timeline.iter().any(|e| e.status == VehicleStatus::Parked) {
      holding += 1;
    }
  }
  holding
}
