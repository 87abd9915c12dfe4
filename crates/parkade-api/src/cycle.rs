//! Handler for `POST /cycle`.
//!
//! Resolves every pending transition, then applies one tick of traffic when
//! the router was built with a traffic source.

use axum::{Json, extract::State};
use parkade_core::{
  store::ParkingStore,
  traffic::{CycleReport, run_cycle},
};

use crate::{ApiState, error::ApiError};

/// `POST /cycle`
pub async fn run<S: ParkingStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<CycleReport>, ApiError> {
  let report = run_cycle(&*state.store, state.traffic.as_deref())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report))
}
