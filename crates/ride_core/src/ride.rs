//! Ride session: the mutable aggregate for one booking.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::drivers::Driver;
use crate::geo::{Bend, GeoPoint, Route};
use crate::pricing::{FareQuote, PaymentMethod, RideTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Requested,
    Assigned,
    EnRoute,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 7] = [
        LifecycleState::Requested,
        LifecycleState::Assigned,
        LifecycleState::EnRoute,
        LifecycleState::Arrived,
        LifecycleState::InProgress,
        LifecycleState::Completed,
        LifecycleState::Cancelled,
    ];

    /// `Completed` and `Cancelled` accept no further lifecycle commands
    /// (a completed ride can still be archived).
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Cancelled)
    }

    /// States in which `tick` advances progress.
    pub fn is_moving(self) -> bool {
        matches!(self, LifecycleState::EnRoute | LifecycleState::InProgress)
    }

    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::Requested => "requested",
            LifecycleState::Assigned => "assigned",
            LifecycleState::EnRoute => "en route",
            LifecycleState::Arrived => "arrived",
            LifecycleState::InProgress => "in progress",
            LifecycleState::Completed => "completed",
            LifecycleState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One active booking.
///
/// Pickup, drop-off, fare and ETA are fixed at booking. The driver is fixed at
/// assignment. `progress` and `route` belong to the current movement leg
/// (driver start -> pickup while `EnRoute`, pickup -> drop-off while
/// `InProgress`); the driver's location is always derived from them.
#[derive(Debug, Clone)]
pub struct RideSession {
    pub(crate) id: Uuid,
    pub(crate) pickup: GeoPoint,
    pub(crate) dropoff: GeoPoint,
    pub(crate) pickup_address: Option<String>,
    pub(crate) dropoff_address: Option<String>,
    pub(crate) quote: FareQuote,
    pub(crate) payment: PaymentMethod,
    pub(crate) bend: Bend,
    pub(crate) state: LifecycleState,
    pub(crate) driver: Option<Arc<Driver>>,
    pub(crate) driver_start: Option<GeoPoint>,
    pub(crate) route: Option<Route>,
    pub(crate) progress: f64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) assigned_at: Option<DateTime<Utc>>,
    pub(crate) picked_up_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

impl RideSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Uuid,
        pickup: GeoPoint,
        dropoff: GeoPoint,
        pickup_address: Option<String>,
        dropoff_address: Option<String>,
        quote: FareQuote,
        payment: PaymentMethod,
        bend: Bend,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            pickup,
            dropoff,
            pickup_address,
            dropoff_address,
            quote,
            payment,
            bend,
            state: LifecycleState::Requested,
            driver: None,
            driver_start: None,
            route: None,
            progress: 0.0,
            created_at,
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn pickup(&self) -> GeoPoint {
        self.pickup
    }

    pub fn dropoff(&self) -> GeoPoint {
        self.dropoff
    }

    pub fn pickup_address(&self) -> Option<&str> {
        self.pickup_address.as_deref()
    }

    pub fn dropoff_address(&self) -> Option<&str> {
        self.dropoff_address.as_deref()
    }

    pub fn driver(&self) -> Option<&Arc<Driver>> {
        self.driver.as_ref()
    }

    pub fn fare(&self) -> f64 {
        self.quote.fare
    }

    pub fn eta_minutes(&self) -> u32 {
        self.quote.eta_minutes
    }

    pub fn distance_km(&self) -> f64 {
        self.quote.distance_km
    }

    pub fn tier(&self) -> RideTier {
        self.quote.tier
    }

    pub fn quote(&self) -> &FareQuote {
        &self.quote
    }

    pub fn payment(&self) -> PaymentMethod {
        self.payment
    }

    pub fn bend(&self) -> Bend {
        self.bend
    }

    /// Route of the current movement leg, if one has started.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn assigned_at(&self) -> Option<DateTime<Utc>> {
        self.assigned_at
    }

    pub fn picked_up_at(&self) -> Option<DateTime<Utc>> {
        self.picked_up_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Where the driver is now: on the current leg's route at `progress`, at
    /// the start point before the first leg, unknown before assignment.
    pub fn driver_location(&self) -> Option<GeoPoint> {
        match &self.route {
            Some(route) => Some(route.position_at(self.progress)),
            None => self.driver_start,
        }
    }

    pub fn snapshot(&self) -> RideSnapshot {
        RideSnapshot {
            ride_id: self.id,
            state: self.state,
            progress: self.progress,
            pickup: self.pickup,
            dropoff: self.dropoff,
            driver_location: self.driver_location(),
            driver: self.driver.as_deref().cloned(),
            fare: self.quote.fare,
            eta_minutes: self.quote.eta_minutes,
            tier: self.quote.tier,
        }
    }
}

/// Read-only copy of a ride for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSnapshot {
    pub ride_id: Uuid,
    pub state: LifecycleState,
    pub progress: f64,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub driver_location: Option<GeoPoint>,
    pub driver: Option<Driver>,
    pub fare: f64,
    pub eta_minutes: u32,
    pub tier: RideTier,
}
