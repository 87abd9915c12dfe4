//! Async HTTP client wrapping the Parkade JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parkade_core::{
  event::{NewVehicle, VehicleEvent},
  projector::StateSnapshot,
  traffic::CycleReport,
};
use reqwest::{Client, Response};

/// Async HTTP client for the Parkade JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// `POST /api/cycle`; the server applies its own traffic settings.
  pub async fn cycle(&self) -> Result<CycleReport> {
    let resp = self
      .client
      .post(self.url("/cycle"))
      .send()
      .await
      .context("POST /cycle failed")?;
    check(resp, "POST /cycle")
      .await?
      .json()
      .await
      .context("deserialising cycle report")
  }

  /// `GET /api/state`
  pub async fn state(&self) -> Result<StateSnapshot> {
    let resp = self
      .client
      .get(self.url("/state"))
      .send()
      .await
      .context("GET /state failed")?;
    check(resp, "GET /state")
      .await?
      .json()
      .await
      .context("deserialising state")
  }

  /// `POST /api/cars/enter`
  pub async fn enter(&self, vehicle: &NewVehicle) -> Result<VehicleEvent> {
    let resp = self
      .client
      .post(self.url("/cars/enter"))
      .json(vehicle)
      .send()
      .await
      .context("POST /cars/enter failed")?;
    check(resp, "POST /cars/enter")
      .await?
      .json()
      .await
      .context("deserialising vehicle event")
  }
}

/// Turn a non-2xx response into an error carrying the server's
/// `{"error": "..."}` message when there is one.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<serde_json::Value>()
    .await
    .ok()
    .and_then(|body| body["error"].as_str().map(str::to_owned))
    .unwrap_or_default();
  Err(anyhow!("{what} → {status} {message}"))
}
