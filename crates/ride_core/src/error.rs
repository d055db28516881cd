//! Error kinds surfaced by the ride core. None of them is fatal: every failure
//! leaves the session usable so the caller can show a message and retry.

use thiserror::Error;

use crate::geocoding::GeocodeError;
use crate::lifecycle::Command;
use crate::ride::LifecycleState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RideError {
    /// An address could not be resolved to coordinates.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// The driver pool is empty.
    #[error("no drivers available")]
    NoDriversAvailable,

    /// A command was issued in a state that does not accept it.
    #[error("cannot {command} while the ride is {from}")]
    InvalidTransition {
        from: LifecycleState,
        command: Command,
    },

    /// Caller-supplied input was rejected (rating out of range, bad coordinates, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// There is no ride to operate on (or nothing completed to archive).
    #[error("no active ride")]
    NoActiveRide,

    /// A new booking was attempted while another ride is still active.
    #[error("a ride is already active (state: {state})")]
    RideAlreadyActive { state: LifecycleState },
}

impl RideError {
    pub fn is_validation(&self) -> bool {
        matches!(self, RideError::Validation(_))
    }
}
