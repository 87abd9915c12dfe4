//! Parking spots: fixed at provisioning, occupancy flips in place.

use serde::{Deserialize, Serialize};

/// A numbered parking spot. Numbers run `1..=capacity` and are never reused
/// for a different spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
  pub number:   u32,
  pub occupied: bool,
}

impl Spot {
  pub fn free(number: u32) -> Self { Self { number, occupied: false } }
}
