//! The Parkade HTTP server: configuration, router assembly and the optional
//! auto-ticker that runs a cycle on a fixed interval.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use parkade_core::{
  policy::{LowestFree, RandomFree},
  projector::{DEFAULT_HISTORY_LIMIT, DEFAULT_RATE_PER_SECOND, StateProjector},
  resolver::CycleResolver,
  store::ParkingStore,
  traffic::{RandomTraffic, TrafficSource, run_cycle},
};
use serde::Deserialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// How arriving vehicles are assigned a free spot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotPolicyKind {
  #[default]
  Lowest,
  Random,
}

impl SpotPolicyKind {
  pub fn resolver(self) -> CycleResolver {
    match self {
      SpotPolicyKind::Lowest => CycleResolver::new(LowestFree),
      SpotPolicyKind::Random => CycleResolver::new(RandomFree),
    }
  }
}

/// Runtime server configuration, deserialised from `parkade.toml` and
/// `PARKADE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Spots provisioned at startup (get-or-create).
  pub capacity:           u32,
  pub rate_per_second:    f64,
  pub history_limit:      usize,
  pub spot_policy:        SpotPolicyKind,
  /// Apply random arrivals and departures on every cycle.
  pub simulate_traffic:   bool,
  /// Run a cycle every N seconds; unset means cycles only run on request.
  pub tick_interval_secs: Option<u64>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      store_path:         PathBuf::from("parkade.db"),
      capacity:           25,
      rate_per_second:    DEFAULT_RATE_PER_SECOND,
      history_limit:      DEFAULT_HISTORY_LIMIT,
      spot_policy:        SpotPolicyKind::Lowest,
      simulate_traffic:   true,
      tick_interval_secs: None,
    }
  }
}

impl ServerConfig {
  pub fn projector(&self) -> StateProjector {
    StateProjector {
      rate_per_second: self.rate_per_second,
      history_limit:   self.history_limit,
    }
  }

  pub fn traffic(&self) -> Option<Arc<dyn TrafficSource>> {
    self
      .simulate_traffic
      .then(|| Arc::new(RandomTraffic::default()) as Arc<dyn TrafficSource>)
  }

  pub fn tick_interval(&self) -> Option<Duration> {
    self
      .tick_interval_secs
      .filter(|secs| *secs > 0)
      .map(Duration::from_secs)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API nested under `/api`, with request tracing.
pub fn router<S>(store: Arc<S>, traffic: Option<Arc<dyn TrafficSource>>) -> Router
where
  S: ParkingStore + 'static,
{
  Router::new()
    .nest("/api", parkade_api::api_router(store, traffic))
    .layer(TraceLayer::new_for_http())
}

// ─── Auto-ticker ─────────────────────────────────────────────────────────────

/// Run [`run_cycle`] every `every` until the returned task is aborted.
///
/// A failed cycle is logged and the ticker keeps going.
pub fn spawn_ticker<S>(
  store: Arc<S>,
  traffic: Option<Arc<dyn TrafficSource>>,
  every: Duration,
) -> JoinHandle<()>
where
  S: ParkingStore + 'static,
{
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
      interval.tick().await;
      match run_cycle(&*store, traffic.as_deref()).await {
        Ok(report) => tracing::debug!(
          parked = report.outcome.parked,
          left = report.outcome.leaving_resolved,
          arrivals = report.arrivals,
          departures = report.departures,
          "tick",
        ),
        Err(e) => tracing::error!(error = %e, "tick failed"),
      }
    }
  })
}
