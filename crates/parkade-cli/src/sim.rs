//! Where the simulator's facility lives: in this process, or behind a
//! Parkade server.

use anyhow::Result;
use parkade_core::{
  event::{NewVehicle, VehicleEvent},
  memory::MemoryStore,
  projector::StateSnapshot,
  store::ParkingStore,
  traffic::{CycleReport, RandomTraffic, run_cycle},
};

use crate::client::ApiClient;

pub enum Backend {
  /// An in-process store driven by local random traffic.
  Local {
    store:   MemoryStore,
    traffic: RandomTraffic,
  },
  /// A remote server; traffic is whatever the server is configured with.
  Remote(ApiClient),
}

impl Backend {
  pub fn local(store: MemoryStore) -> Self {
    Backend::Local { store, traffic: RandomTraffic::default() }
  }

  pub fn describe(&self) -> String {
    match self {
      Backend::Local { .. } => "local".to_string(),
      Backend::Remote(client) => client.base_url().to_string(),
    }
  }

  pub async fn tick(&self) -> Result<CycleReport> {
    match self {
      Backend::Local { store, traffic } => Ok(run_cycle(store, Some(traffic)).await?),
      Backend::Remote(client) => client.cycle().await,
    }
  }

  pub async fn snapshot(&self) -> Result<StateSnapshot> {
    match self {
      Backend::Local { store, .. } => Ok(store.snapshot().await?),
      Backend::Remote(client) => client.state().await,
    }
  }

  pub async fn admit(&self, vehicle: NewVehicle) -> Result<VehicleEvent> {
    match self {
      Backend::Local { store, .. } => Ok(store.admit_vehicle(vehicle).await?),
      Backend::Remote(client) => client.enter(&vehicle).await,
    }
  }
}
