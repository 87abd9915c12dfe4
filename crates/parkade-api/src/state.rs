//! Read-model handlers: `GET /state`, `GET /events` and `GET /audit`.

use axum::{
  Json,
  extract::{Query, State},
};
use parkade_core::{
  audit::Violation,
  event::{EventSeq, VehicleEvent},
  projector::StateSnapshot,
  store::ParkingStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

const DEFAULT_EVENT_LIMIT: usize = 100;
const MAX_EVENT_LIMIT: usize = 1000;

/// `GET /state`
pub async fn snapshot<S: ParkingStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<StateSnapshot>, ApiError> {
  let snapshot = state.store.snapshot().await.map_err(ApiError::from_store)?;
  Ok(Json(snapshot))
}

#[derive(Debug, Deserialize, Default)]
pub struct EventParams {
  /// Only events with a larger `seq`.
  pub since: Option<EventSeq>,
  pub limit: Option<usize>,
}

/// `GET /events[?since=<seq>][&limit=<n>]`
pub async fn events<S: ParkingStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EventParams>,
) -> Result<Json<Vec<VehicleEvent>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
  if limit == 0 || limit > MAX_EVENT_LIMIT {
    return Err(ApiError::BadRequest(format!(
      "limit must be between 1 and {MAX_EVENT_LIMIT}"
    )));
  }

  let events = state
    .store
    .events_since(params.since, limit)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(events))
}

/// `GET /audit`
pub async fn audit<S: ParkingStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Violation>>, ApiError> {
  let violations = state.store.audit().await.map_err(ApiError::from_store)?;
  Ok(Json(violations))
}
