//! Error types for `parkade-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::event::VehicleStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Rejected input; raised before anything is written.
  #[error("invalid vehicle: {0}")]
  InvalidVehicle(String),

  #[error("spot {0} is already occupied")]
  SpotOccupied(u32),

  #[error("spot {0} does not exist")]
  UnknownSpot(u32),

  #[error("vehicle {vehicle_id} cannot move from {from} to {to}")]
  InvalidTransition {
    vehicle_id: Uuid,
    from:       VehicleStatus,
    to:         VehicleStatus,
  },

  #[error("vehicle not found: {0}")]
  VehicleNotFound(Uuid),

  #[error("vehicle {vehicle_id} is {status}, not parked")]
  NotParked {
    vehicle_id: Uuid,
    status:     VehicleStatus,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error taxonomy shared by every backend, used by callers to decide
/// what the failure means for them (bad input, missing vehicle, bug, I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  Validation,
  NotFound,
  /// An allocator or state-machine invariant was violated upstream.
  Allocation,
  Storage,
}

/// Implemented by every store error type.
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Error::InvalidVehicle(_) => ErrorClass::Validation,
      Error::SpotOccupied(_)
      | Error::UnknownSpot(_)
      | Error::InvalidTransition { .. } => ErrorClass::Allocation,
      Error::VehicleNotFound(_) | Error::NotParked { .. } => {
        ErrorClass::NotFound
      }
    }
  }
}
