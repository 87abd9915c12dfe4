//! JSON REST API for Parkade.
//!
//! Exposes an axum [`Router`] backed by any
//! [`parkade_core::store::ParkingStore`]. Transport, TLS and request tracing
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parkade_api::api_router(store.clone(), Some(traffic)))
//! ```

pub mod cars;
pub mod cycle;
pub mod error;
pub mod state;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use parkade_core::{store::ParkingStore, traffic::TrafficSource};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  /// Traffic applied after each `POST /cycle`; `None` only resolves.
  pub traffic: Option<Arc<dyn TrafficSource>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), traffic: self.traffic.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, traffic: Option<Arc<dyn TrafficSource>>) -> Router<()>
where
  S: ParkingStore + 'static,
{
  Router::new()
    // Cycle
    .route("/cycle", post(cycle::run::<S>))
    // Cars
    .route("/cars", get(cars::list::<S>))
    .route("/cars/enter", post(cars::enter::<S>))
    .route("/cars/{id}", get(cars::timeline::<S>))
    .route("/cars/{id}/depart", post(cars::depart::<S>))
    // Read model
    .route("/state", get(state::snapshot::<S>))
    .route("/events", get(state::events::<S>))
    .route("/audit", get(state::audit::<S>))
    .with_state(ApiState { store, traffic })
}
