//! Handlers for `/cars` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cars` | Optional `?status=entering\|parked\|leaving\|has_left` (default `parked`) |
//! | `POST` | `/cars/enter` | Body: `{"license_plate":"ABC-123","model":"Civic"}` |
//! | `GET`  | `/cars/{id}` | Full timeline; 404 if unknown |
//! | `POST` | `/cars/{id}/depart` | 404 if unknown or not parked |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use parkade_core::{
  event::{NewVehicle, VehicleEvent, VehicleStatus},
  store::ParkingStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<VehicleStatus>,
}

/// `GET /cars[?status=<status>]`
pub async fn list<S: ParkingStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<VehicleEvent>>, ApiError> {
  let vehicles = state
    .store
    .current_vehicles(params.status.unwrap_or(VehicleStatus::Parked))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(vehicles))
}

// ─── Enter ───────────────────────────────────────────────────────────────────

/// `POST /cars/enter`
///
/// A body that does not parse as a vehicle is a 400, like any other invalid
/// vehicle.
pub async fn enter<S: ParkingStore>(
  State(state): State<ApiState<S>>,
  body: Result<Json<NewVehicle>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let event = state
    .store
    .admit_vehicle(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Timeline ────────────────────────────────────────────────────────────────

/// `GET /cars/{id}`
pub async fn timeline<S: ParkingStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<VehicleEvent>>, ApiError> {
  let events = state
    .store
    .vehicle_timeline(id)
    .await
    .map_err(ApiError::from_store)?;
  if events.is_empty() {
    return Err(ApiError::NotFound(format!("vehicle {id} not found")));
  }
  Ok(Json(events))
}

// ─── Depart ──────────────────────────────────────────────────────────────────

/// `POST /cars/{id}/depart`
pub async fn depart<S: ParkingStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<VehicleEvent>, ApiError> {
  let event = state
    .store
    .request_departure(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(event))
}
