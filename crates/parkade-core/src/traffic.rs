//! Simulated traffic: who arrives and who leaves between passes.
//!
//! A [`TrafficSource`] plans new arrivals and departures of parked vehicles;
//! [`run_cycle`] resolves the previous pass and then applies the plan, so new
//! requests are only resolved on the following tick.

use std::sync::Arc;

use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Classify, ErrorClass,
  event::{NewVehicle, VehicleEvent, VehicleStatus},
  policy::{DeparturePolicy, RandomDepartures},
  resolver::CycleOutcome,
  store::ParkingStore,
};

const MODELS: &[&str] = &[
  "Toyota", "Honda", "Ford", "Chevrolet", "Nissan", "BMW", "Mercedes", "Volkswagen",
];
const COLORS: &[&str] = &["Red", "Blue", "Green", "Black", "White", "Silver", "Yellow"];

/// Requests produced by a traffic source for one tick.
#[derive(Debug, Clone, Default)]
pub struct TrafficPlan {
  pub arrivals:   Vec<NewVehicle>,
  pub departures: Vec<Uuid>,
}

pub trait TrafficSource: Send + Sync {
  /// Plan this tick's traffic given the currently parked vehicles.
  fn plan(&self, parked: &[VehicleEvent]) -> TrafficPlan;
}

/// Each tick either a handful of cars arrive or a handful of parked cars
/// leave, with even odds. When nobody is parked, cars always arrive.
#[derive(Clone)]
pub struct RandomTraffic {
  pub max_arrivals:   usize,
  pub max_departures: usize,
  departures:         Arc<dyn DeparturePolicy>,
}

impl Default for RandomTraffic {
  fn default() -> Self {
    Self { max_arrivals: 3, max_departures: 3, departures: Arc::new(RandomDepartures) }
  }
}

impl RandomTraffic {
  pub fn with_departure_policy(mut self, policy: impl DeparturePolicy + 'static) -> Self {
    self.departures = Arc::new(policy);
    self
  }
}

impl TrafficSource for RandomTraffic {
  fn plan(&self, parked: &[VehicleEvent]) -> TrafficPlan {
    let mut rng = rand::thread_rng();
    let mut plan = TrafficPlan::default();

    if parked.is_empty() || rng.gen_bool(0.5) {
      let count = if self.max_arrivals == 0 { 0 } else { rng.gen_range(1..=self.max_arrivals) };
      plan.arrivals = (0..count).map(|_| random_vehicle(&mut rng)).collect();
    } else {
      let max = self.max_departures.min(parked.len());
      if max > 0 {
        plan.departures = self.departures.select(parked, rng.gen_range(1..=max));
      }
    }

    plan
  }
}

/// A vehicle with a plate like `KXR-042` and random descriptive fields.
pub fn random_vehicle(rng: &mut impl Rng) -> NewVehicle {
  let letters: String = (0..3).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
  let digits: u16 = rng.gen_range(0..1000);

  NewVehicle {
    license_plate: format!("{letters}-{digits:03}"),
    model:         MODELS.choose(&mut *rng).map(|m| (*m).to_owned()),
    color:         COLORS.choose(&mut *rng).map(|c| (*c).to_owned()),
    year:          Some(rng.gen_range(1990..=2025)),
  }
}

// ─── Tick ────────────────────────────────────────────────────────────────────

/// The result of [`run_cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
  #[serde(flatten)]
  pub outcome:    CycleOutcome,
  /// Vehicles admitted after resolution.
  pub arrivals:   usize,
  /// Parked vehicles sent to `Leaving` after resolution.
  pub departures: usize,
}

/// Resolve the pending transitions, then apply `traffic` (if any).
///
/// A planned departure whose vehicle is no longer parked is skipped.
pub async fn run_cycle<S: ParkingStore>(
  store: &S,
  traffic: Option<&dyn TrafficSource>,
) -> Result<CycleReport, S::Error> {
  let outcome = store.advance_cycle().await?;
  let mut report = CycleReport { outcome, ..CycleReport::default() };

  let Some(traffic) = traffic else {
    return Ok(report);
  };

  let parked = store.current_vehicles(VehicleStatus::Parked).await?;
  let plan = traffic.plan(&parked);

  for vehicle in plan.arrivals {
    store.admit_vehicle(vehicle).await?;
    report.arrivals += 1;
  }

  for vehicle_id in plan.departures {
    match store.request_departure(vehicle_id).await {
      Ok(_) => report.departures += 1,
      Err(e) if e.class() == ErrorClass::NotFound => {
        tracing::warn!(vehicle = %vehicle_id, error = %e, "skipping planned departure");
      }
      Err(e) => return Err(e),
    }
  }

  Ok(report)
}
