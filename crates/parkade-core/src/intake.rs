//! Externally requested transitions: admitting a vehicle and asking a parked
//! vehicle to leave. The resolver picks both up on its next pass.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error,
  event::{NewVehicle, PendingEvent, VehicleEvent, VehicleStatus},
  ledger::EventLog,
};

/// Append the first `Entering` event for a new vehicle.
///
/// Input is validated before anything is written.
pub fn admit_vehicle<L: EventLog>(
  ledger: &mut L,
  input: NewVehicle,
  now: DateTime<Utc>,
) -> Result<VehicleEvent, L::Error> {
  let vehicle = input.validate()?;
  let event = ledger.append(PendingEvent::admission(vehicle, now))?;
  tracing::info!(
    vehicle = %event.vehicle_id,
    plate = %event.vehicle.license_plate,
    "vehicle admitted",
  );
  Ok(event)
}

/// Append a `Leaving` event for a vehicle that is currently parked.
pub fn request_departure<L: EventLog>(
  ledger: &mut L,
  vehicle_id: Uuid,
  now: DateTime<Utc>,
) -> Result<VehicleEvent, L::Error> {
  let current = ledger
    .latest_for(vehicle_id)?
    .ok_or(Error::VehicleNotFound(vehicle_id))?;

  if current.status != VehicleStatus::Parked {
    return Err(Error::NotParked { vehicle_id, status: current.status }.into());
  }

  let event = ledger.append(current.successor(VehicleStatus::Leaving, None, now)?)?;
  tracing::info!(vehicle = %vehicle_id, "departure requested");
  Ok(event)
}
