//! Vehicle events: the fundamental unit of the Parkade event log.
//!
//! An event is an immutable record that a vehicle reached a lifecycle status
//! at a point in time. Events are never updated; a vehicle moves forward by
//! appending a copy of its latest event with a new status.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Auto-incrementing insertion order assigned by the event log. Breaks ties
/// between events that share a timestamp.
pub type EventSeq = i64;

pub const MAX_PLATE_LEN: usize = 15;
pub const MAX_MODEL_LEN: usize = 64;
pub const MAX_COLOR_LEN: usize = 32;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a vehicle is in its visit.
///
/// Valid timelines are prefixes of `Entering → Parked → Leaving → HasLeft`
/// or `Entering → Leaving → HasLeft`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
  Entering,
  Parked,
  Leaving,
  HasLeft,
}

impl VehicleStatus {
  pub const ALL: [VehicleStatus; 4] = [
    VehicleStatus::Entering,
    VehicleStatus::Parked,
    VehicleStatus::Leaving,
    VehicleStatus::HasLeft,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      VehicleStatus::Entering => "entering",
      VehicleStatus::Parked => "parked",
      VehicleStatus::Leaving => "leaving",
      VehicleStatus::HasLeft => "has_left",
    }
  }

  /// Whether `next` may directly follow `self` in a vehicle's timeline.
  pub fn can_advance_to(self, next: VehicleStatus) -> bool {
    use VehicleStatus::*;
    matches!(
      (self, next),
      (Entering, Parked) | (Entering, Leaving) | (Parked, Leaving) | (Leaving, HasLeft)
    )
  }

  pub fn is_terminal(self) -> bool { self == VehicleStatus::HasLeft }
}

impl fmt::Display for VehicleStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VehicleStatus {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    VehicleStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| format!("unknown vehicle status: {s:?}"))
  }
}

// ─── Descriptive fields ──────────────────────────────────────────────────────

/// The descriptive part of a vehicle, copied verbatim into every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
  pub license_plate: String,
  #[serde(default)]
  pub model:         String,
  #[serde(default)]
  pub color:         String,
  pub year:          Option<u16>,
}

/// Input for admitting a vehicle. Only the plate is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVehicle {
  pub license_plate: String,
  pub model:         Option<String>,
  pub color:         Option<String>,
  pub year:          Option<u16>,
}

impl NewVehicle {
  pub fn new(license_plate: impl Into<String>) -> Self {
    Self { license_plate: license_plate.into(), ..Self::default() }
  }

  /// Normalise and check the input, producing the descriptive fields that
  /// every event for this vehicle will carry.
  pub fn validate(self) -> Result<Vehicle> {
    let license_plate = self.license_plate.trim().to_owned();
    if license_plate.is_empty() {
      return Err(Error::InvalidVehicle("license plate is empty".into()));
    }
    check_len("license plate", &license_plate, MAX_PLATE_LEN)?;

    let model = self.model.unwrap_or_default().trim().to_owned();
    check_len("model", &model, MAX_MODEL_LEN)?;

    let color = self.color.unwrap_or_default().trim().to_owned();
    check_len("color", &color, MAX_COLOR_LEN)?;

    if self.year == Some(0) {
      return Err(Error::InvalidVehicle("year must be positive".into()));
    }

    Ok(Vehicle { license_plate, model, color, year: self.year })
  }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
  if value.chars().count() > max {
    return Err(Error::InvalidVehicle(format!(
      "{field} is longer than {max} characters"
    )));
  }
  Ok(())
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A persisted lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleEvent {
  pub seq:        EventSeq,
  pub vehicle_id: Uuid,
  #[serde(flatten)]
  pub vehicle:    Vehicle,
  pub status:     VehicleStatus,
  pub timestamp:  DateTime<Utc>,
  /// Set only on `Parked` events.
  pub spot:       Option<u32>,
}

impl VehicleEvent {
  /// Build the next event in this vehicle's timeline.
  ///
  /// The descriptive fields are copied; `spot` must be present exactly when
  /// `status` is `Parked`. The timestamp is clamped so the new event never
  /// sorts before this one.
  pub fn successor(
    &self,
    status: VehicleStatus,
    spot: Option<u32>,
    at: DateTime<Utc>,
  ) -> Result<PendingEvent> {
    let spot_ok = spot.is_some() == (status == VehicleStatus::Parked);
    if !self.status.can_advance_to(status) || !spot_ok {
      return Err(Error::InvalidTransition {
        vehicle_id: self.vehicle_id,
        from:       self.status,
        to:         status,
      });
    }

    Ok(PendingEvent {
      vehicle_id: self.vehicle_id,
      vehicle: self.vehicle.clone(),
      status,
      timestamp: at.max(self.timestamp),
      spot,
    })
  }
}

/// An event that has not been appended yet; the log assigns its `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
  pub vehicle_id: Uuid,
  pub vehicle:    Vehicle,
  pub status:     VehicleStatus,
  pub timestamp:  DateTime<Utc>,
  pub spot:       Option<u32>,
}

impl PendingEvent {
  /// The first event of a brand-new vehicle.
  pub fn admission(vehicle: Vehicle, at: DateTime<Utc>) -> Self {
    Self {
      vehicle_id: Uuid::new_v4(),
      vehicle,
      status: VehicleStatus::Entering,
      timestamp: at,
      spot: None,
    }
  }

  pub fn into_event(self, seq: EventSeq) -> VehicleEvent {
    VehicleEvent {
      seq,
      vehicle_id: self.vehicle_id,
      vehicle: self.vehicle,
      status: self.status,
      timestamp: self.timestamp,
      spot: self.spot,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn event(status: VehicleStatus) -> VehicleEvent {
    PendingEvent::admission(
      NewVehicle::new("ABC-123").validate().unwrap(),
      Utc::now(),
    )
    .into_event(1)
    .with_status(status)
  }

  impl VehicleEvent {
    fn with_status(mut self, status: VehicleStatus) -> Self {
      self.status = status;
      self
    }
  }

  #[test]
  fn empty_plate_is_rejected() {
    let err = NewVehicle::new("   ").validate().unwrap_err();
    assert!(matches!(err, Error::InvalidVehicle(_)));
  }

  #[test]
  fn overlong_fields_are_rejected() {
    assert!(NewVehicle::new("X".repeat(16)).validate().is_err());

    let mut input = NewVehicle::new("ABC-123");
    input.color = Some("c".repeat(33));
    assert!(input.validate().is_err());
  }

  #[test]
  fn validate_trims_and_defaults() {
    let mut input = NewVehicle::new("  ABC-123 ");
    input.model = Some(" Civic ".into());
    let vehicle = input.validate().unwrap();
    assert_eq!(vehicle.license_plate, "ABC-123");
    assert_eq!(vehicle.model, "Civic");
    assert_eq!(vehicle.color, "");
    assert_eq!(vehicle.year, None);
  }

  #[test]
  fn transitions_follow_the_two_paths() {
    use crate::event::VehicleStatus::*;
    assert!(Entering.can_advance_to(Parked));
    assert!(Entering.can_advance_to(Leaving));
    assert!(Parked.can_advance_to(Leaving));
    assert!(Leaving.can_advance_to(HasLeft));

    assert!(!Entering.can_advance_to(HasLeft));
    assert!(!Parked.can_advance_to(Entering));
    assert!(!Parked.can_advance_to(HasLeft));
    assert!(!HasLeft.can_advance_to(Entering));
  }

  #[test]
  fn successor_copies_fields_and_clamps_time() {
    let entering = event(VehicleStatus::Entering);
    let earlier = entering.timestamp - chrono::Duration::seconds(5);

    let parked = entering
      .successor(VehicleStatus::Parked, Some(3), earlier)
      .unwrap();
    assert_eq!(parked.vehicle_id, entering.vehicle_id);
    assert_eq!(parked.vehicle, entering.vehicle);
    assert_eq!(parked.timestamp, entering.timestamp);
    assert_eq!(parked.spot, Some(3));
  }

  #[test]
  fn successor_requires_spot_only_when_parking() {
    let entering = event(VehicleStatus::Entering);
    let now = Utc::now();
    assert!(entering.successor(VehicleStatus::Parked, None, now).is_err());
    assert!(entering.successor(VehicleStatus::Leaving, Some(1), now).is_err());

    let left = event(VehicleStatus::HasLeft);
    let err = left.successor(VehicleStatus::Leaving, None, now).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  #[test]
  fn status_round_trips_through_str() {
    for status in VehicleStatus::ALL {
      assert_eq!(status.as_str().parse::<VehicleStatus>(), Ok(status));
    }
    assert!("parking".parse::<VehicleStatus>().is_err());
  }
}
