//! Session context: per-user container for at most one active ride plus the
//! user's ride history, and the entry point for every ride command.
//!
//! Every operation takes the context explicitly; there is no global state.
//! Hosts that can receive commands for one user from several places at once
//! wrap the context in a [`SharedSession`], which processes one command at a
//! time.

use std::sync::{Arc, Mutex, PoisonError};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::drivers::DriverDirectory;
use crate::error::RideError;
use crate::geo::{Bend, GeoPoint};
use crate::geocoding::{
    DistanceProvider, GazetteerGeocoder, GeocodeError, Geocoder, HaversineDistance,
    DEFAULT_CENTER,
};
use crate::history::{Rating, RideHistory, RideHistoryEntry};
use crate::lifecycle::Command;
use crate::pricing::{FareQuote, PaymentMethod, RideTier};
use crate::random::{RandomSource, SeededRandom};
use crate::ride::{LifecycleState, RideSession, RideSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
}

impl UserIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Pickup or drop-off as the rider gave it.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Address(String),
    Point(GeoPoint),
}

impl From<&str> for Location {
    fn from(address: &str) -> Self {
        Location::Address(address.to_string())
    }
}

impl From<String> for Location {
    fn from(address: String) -> Self {
        Location::Address(address)
    }
}

impl From<GeoPoint> for Location {
    fn from(point: GeoPoint) -> Self {
        Location::Point(point)
    }
}

/// Booking form contents.
#[derive(Debug, Clone, PartialEq)]
pub struct RideRequest {
    pub pickup: Location,
    pub dropoff: Location,
    pub tier: RideTier,
    pub payment: PaymentMethod,
}

impl RideRequest {
    pub fn new(pickup: impl Into<Location>, dropoff: impl Into<Location>) -> Self {
        Self {
            pickup: pickup.into(),
            dropoff: dropoff.into(),
            tier: RideTier::default(),
            payment: PaymentMethod::default(),
        }
    }

    pub fn with_tier(mut self, tier: RideTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_payment(mut self, payment: PaymentMethod) -> Self {
        self.payment = payment;
        self
    }
}

/// Read-only view of the whole session for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub username: String,
    pub active_ride: Option<RideSnapshot>,
    pub completed_rides: usize,
    pub total_spent: f64,
}

/// Builder for a [`SessionContext`] with substituted collaborators.
pub struct SessionBuilder {
    identity: UserIdentity,
    config: SessionConfig,
    directory: DriverDirectory,
    geocoder: Option<Box<dyn Geocoder>>,
    distance: Option<Box<dyn DistanceProvider>>,
    clock: Option<Box<dyn Clock>>,
    rng: Option<Box<dyn RandomSource>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn directory(mut self, directory: DriverDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn geocoder(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoder = Some(Box::new(geocoder));
        self
    }

    pub fn distance(mut self, distance: impl DistanceProvider + 'static) -> Self {
        self.distance = Some(Box::new(distance));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn build(self) -> Result<SessionContext, RideError> {
        validate_config(&self.config)?;
        let seed = self.config.seed;
        Ok(SessionContext {
            identity: self.identity,
            config: self.config,
            directory: self.directory,
            geocoder: self
                .geocoder
                .unwrap_or_else(|| Box::new(GazetteerGeocoder::default())),
            distance: self.distance.unwrap_or_else(|| Box::new(HaversineDistance)),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            rng: self
                .rng
                .unwrap_or_else(|| Box::new(SeededRandom::new(seed))),
            active_ride: None,
            history: RideHistory::new(),
        })
    }
}

fn validate_config(config: &SessionConfig) -> Result<(), RideError> {
    let motion = &config.motion;
    let fare = &config.fare;
    let checks = [
        (
            motion.tick_step.is_finite() && motion.tick_step > 0.0 && motion.tick_step <= 1.0,
            "tick_step must be in (0, 1]",
        ),
        (motion.route_points >= 2, "route_points must be >= 2"),
        (
            motion.curvature.is_finite() && motion.curvature >= 0.0,
            "curvature must be finite and >= 0",
        ),
        (
            motion.driver_start_radius_deg.is_finite() && motion.driver_start_radius_deg >= 0.0,
            "driver_start_radius_deg must be finite and >= 0",
        ),
        (
            config.fallback_distance_km.is_finite() && config.fallback_distance_km >= 0.0,
            "fallback_distance_km must be finite and >= 0",
        ),
        (
            fare.base_fare.is_finite() && fare.base_fare >= 0.0,
            "base_fare must be finite and >= 0",
        ),
        (
            fare.per_km_rate.is_finite() && fare.per_km_rate >= 0.0,
            "per_km_rate must be finite and >= 0",
        ),
        (
            fare.average_speed_kmh.is_finite() && fare.average_speed_kmh > 0.0,
            "average_speed_kmh must be finite and > 0",
        ),
    ];
    match checks.iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(RideError::Validation((*message).to_string())),
        None => Ok(()),
    }
}

/// One end of a trip as booked.
struct Endpoint {
    point: GeoPoint,
    address: Option<String>,
    /// False when geocoding failed and `point` is the map centre.
    located: bool,
}

impl Endpoint {
    fn unlocated(location: &Location, err: &GeocodeError) -> Self {
        warn!(
            error = %err,
            center = %DEFAULT_CENTER,
            "geocoding failed, using map centre and fallback distance"
        );
        let address = match location {
            Location::Address(address) => Some(address.clone()),
            Location::Point(_) => None,
        };
        Self {
            point: DEFAULT_CENTER,
            address,
            located: false,
        }
    }
}

#[derive(Resource)]
pub struct SessionContext {
    identity: UserIdentity,
    config: SessionConfig,
    directory: DriverDirectory,
    geocoder: Box<dyn Geocoder>,
    distance: Box<dyn DistanceProvider>,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
    active_ride: Option<RideSession>,
    history: RideHistory,
}

/// New session with default collaborators and the demo driver fleet.
pub fn start_session(identity: UserIdentity) -> SessionContext {
    let seed = SessionConfig::default().seed;
    SessionContext {
        identity,
        config: SessionConfig::default(),
        directory: DriverDirectory::with_demo_fleet(),
        geocoder: Box::new(GazetteerGeocoder::default()),
        distance: Box::new(HaversineDistance),
        clock: Box::new(SystemClock),
        rng: Box::new(SeededRandom::new(seed)),
        active_ride: None,
        history: RideHistory::new(),
    }
}

/// Tear a session down. Any active ride is dropped without a history entry;
/// the history is handed back to the caller.
pub fn end_session(ctx: SessionContext) -> RideHistory {
    ctx.end()
}

impl SessionContext {
    pub fn builder(identity: UserIdentity) -> SessionBuilder {
        SessionBuilder {
            identity,
            config: SessionConfig::default(),
            directory: DriverDirectory::with_demo_fleet(),
            geocoder: None,
            distance: None,
            clock: None,
            rng: None,
        }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn directory(&self) -> &DriverDirectory {
        &self.directory
    }

    pub fn active_ride(&self) -> Option<&RideSession> {
        self.active_ride.as_ref()
    }

    pub fn history(&self) -> &RideHistory {
        &self.history
    }

    pub fn state(&self) -> Option<LifecycleState> {
        self.active_ride.as_ref().map(RideSession::state)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.identity.username.clone(),
            active_ride: self.active_ride.as_ref().map(RideSession::snapshot),
            completed_rides: self.history.len(),
            total_spent: self.history.total_spent(),
        }
    }

    // -----------------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------------

    /// Fare and ETA for every tier, without booking anything.
    pub fn quote_options(
        &self,
        pickup: &Location,
        dropoff: &Location,
    ) -> Result<Vec<FareQuote>, RideError> {
        let (pickup, dropoff) = self.locate_trip(pickup, dropoff)?;
        let distance_km = self.trip_distance_km(&pickup, &dropoff);
        Ok(RideTier::ALL
            .iter()
            .map(|tier| self.config.fare.quote(distance_km, *tier))
            .collect())
    }

    /// Book a standard ride between two free-text addresses.
    pub fn request_ride(&mut self, pickup: &str, dropoff: &str) -> Result<&RideSession, RideError> {
        self.book(RideRequest::new(pickup, dropoff))
    }

    /// Book a standard ride between two known points.
    pub fn request_ride_at(
        &mut self,
        pickup: GeoPoint,
        dropoff: GeoPoint,
    ) -> Result<&RideSession, RideError> {
        self.book(RideRequest::new(pickup, dropoff))
    }

    /// Create the session's ride in `Requested`. Fare and ETA are fixed here.
    ///
    /// An address that cannot be geocoded is placed at [`DEFAULT_CENTER`] and
    /// the trip is priced at `fallback_distance_km`, as is a failing distance
    /// lookup. Only a trip where neither end resolves is rejected.
    pub fn book(&mut self, request: RideRequest) -> Result<&RideSession, RideError> {
        if let Some(ride) = &self.active_ride {
            return Err(RideError::RideAlreadyActive { state: ride.state });
        }

        let (pickup, dropoff) = self.locate_trip(&request.pickup, &request.dropoff)?;
        let distance_km = self.trip_distance_km(&pickup, &dropoff);
        let quote = self.config.fare.quote(distance_km, request.tier);

        let id = self.next_ride_id();
        let bend = Bend::from_uniform(self.rng.uniform());
        let ride = RideSession::new(
            id,
            pickup.point,
            dropoff.point,
            pickup.address,
            dropoff.address,
            quote,
            request.payment,
            bend,
            self.clock.now(),
        );
        info!(
            ride_id = %id,
            user = %self.identity.username,
            distance_km = quote.distance_km,
            fare = quote.fare,
            eta_minutes = quote.eta_minutes,
            tier = ?quote.tier,
            "ride requested"
        );
        Ok(&*self.active_ride.insert(ride))
    }

    fn locate(&self, location: &Location) -> Result<Endpoint, GeocodeError> {
        match location {
            Location::Point(point) => Ok(Endpoint {
                point: *point,
                address: None,
                located: true,
            }),
            Location::Address(address) => {
                let point = self.geocoder.geocode(address)?;
                Ok(Endpoint {
                    point,
                    address: Some(address.clone()),
                    located: true,
                })
            }
        }
    }

    fn locate_trip(
        &self,
        pickup: &Location,
        dropoff: &Location,
    ) -> Result<(Endpoint, Endpoint), RideError> {
        match (self.locate(pickup), self.locate(dropoff)) {
            (Err(err), Err(_)) => Err(err.into()),
            (pickup_result, dropoff_result) => Ok((
                pickup_result.unwrap_or_else(|err| Endpoint::unlocated(pickup, &err)),
                dropoff_result.unwrap_or_else(|err| Endpoint::unlocated(dropoff, &err)),
            )),
        }
    }

    fn trip_distance_km(&self, pickup: &Endpoint, dropoff: &Endpoint) -> f64 {
        let fallback = self.config.fallback_distance_km;
        if !(pickup.located && dropoff.located) {
            return fallback;
        }
        match self.distance.distance_km(pickup.point, dropoff.point) {
            Ok(distance) if distance.is_finite() && distance >= 0.0 => distance,
            Ok(distance) => {
                warn!(distance, fallback, "distance provider returned an invalid value");
                fallback
            }
            Err(err) => {
                warn!(error = %err, fallback, "distance lookup failed, using fallback");
                fallback
            }
        }
    }

    fn next_ride_id(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.rng.next_u64().to_be_bytes());
        bytes[8..].copy_from_slice(&self.rng.next_u64().to_be_bytes());
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    // -----------------------------------------------------------------------
    // Lifecycle commands
    // -----------------------------------------------------------------------

    /// `Requested -> Assigned` with a driver drawn uniformly from the directory.
    /// On an empty pool the ride stays `Requested` so the rider can retry or cancel.
    pub fn assign_driver(&mut self) -> Result<&RideSession, RideError> {
        let radius = self.config.motion.driver_start_radius_deg;
        let now = self.clock.now();
        let ride = self.active_ride.as_mut().ok_or(RideError::NoActiveRide)?;
        if !ride.state.accepts(Command::AssignDriver) {
            return Err(RideError::InvalidTransition {
                from: ride.state,
                command: Command::AssignDriver,
            });
        }

        let driver = self.directory.assign_random(self.rng.as_mut())?;
        let lat_offset = (self.rng.uniform() * 2.0 - 1.0) * radius;
        let lng_offset = (self.rng.uniform() * 2.0 - 1.0) * radius;
        let start = GeoPoint::clamped(ride.pickup.lat() + lat_offset, ride.pickup.lng() + lng_offset);

        info!(ride_id = %ride.id, driver = %driver.name, plate = %driver.plate, "driver assigned");
        ride.assign(driver, start, now)?;
        Ok(&*ride)
    }

    /// `Assigned -> EnRoute`: the driver starts towards pickup.
    pub fn begin_en_route(&mut self) -> Result<&RideSession, RideError> {
        let motion = self.config.motion;
        let ride = self.active_ride.as_mut().ok_or(RideError::NoActiveRide)?;
        ride.begin_en_route(&motion)?;
        Ok(&*ride)
    }

    /// Advance the driver one step. A no-op outside `EnRoute`/`InProgress`, and
    /// `None` when there is no ride at all; never an error, so a refresh loop
    /// can poll freely.
    pub fn tick(&mut self) -> Option<&RideSession> {
        let step = self.config.motion.tick_step;
        let now = self.clock.now();
        let ride = self.active_ride.as_mut()?;
        let before = ride.state;
        let after = ride.advance(step, now);
        if before != after {
            info!(ride_id = %ride.id, state = %after, "driver reached leg end");
        }
        Some(&*ride)
    }

    /// `Arrived -> InProgress`: rider on board, heading to drop-off.
    pub fn start_trip(&mut self) -> Result<&RideSession, RideError> {
        let motion = self.config.motion;
        let now = self.clock.now();
        let ride = self.active_ride.as_mut().ok_or(RideError::NoActiveRide)?;
        ride.start_trip(&motion, now)?;
        Ok(&*ride)
    }

    /// Cancel and discard the active ride. No history entry is written.
    /// Returns the discarded ride, now in `Cancelled`.
    pub fn cancel(&mut self) -> Result<RideSession, RideError> {
        let mut ride = self.active_ride.take().ok_or(RideError::NoActiveRide)?;
        if let Err(err) = ride.cancel() {
            self.active_ride = Some(ride);
            return Err(err);
        }
        info!(ride_id = %ride.id, progress = ride.progress, "ride cancelled");
        Ok(ride)
    }

    /// Rate a completed ride and archive it. `rating` must be in `[1, 5]`.
    pub fn submit_feedback(
        &mut self,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<RideHistoryEntry, RideError> {
        let rating = Rating::new(rating)?;
        self.archive_completed_ride(rating, feedback.map(str::to_owned))
    }

    /// Move the completed active ride into the ledger and clear it.
    /// Fails with `NoActiveRide` unless the active ride is `Completed`.
    pub fn archive_completed_ride(
        &mut self,
        rating: Rating,
        feedback: Option<String>,
    ) -> Result<RideHistoryEntry, RideError> {
        match &self.active_ride {
            Some(ride) if ride.state == LifecycleState::Completed => {}
            _ => return Err(RideError::NoActiveRide),
        }
        let ride = self.active_ride.take().ok_or(RideError::NoActiveRide)?;

        let feedback = feedback
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let entry = RideHistoryEntry {
            ride_id: ride.id,
            timestamp: ride.completed_at.unwrap_or_else(|| self.clock.now()),
            driver_name: ride
                .driver
                .as_ref()
                .map(|driver| driver.name.clone())
                .unwrap_or_default(),
            pickup: ride.pickup,
            dropoff: ride.dropoff,
            pickup_address: ride.pickup_address,
            dropoff_address: ride.dropoff_address,
            distance_km: ride.quote.distance_km,
            fare: ride.quote.fare,
            tier: ride.quote.tier,
            payment: ride.payment,
            rating,
            feedback,
        };
        info!(
            ride_id = %entry.ride_id,
            rating = rating.stars(),
            fare = entry.fare,
            "ride archived"
        );
        Ok(self.history.append(entry).clone())
    }

    /// See [`end_session`].
    pub fn end(mut self) -> RideHistory {
        if let Some(ride) = self.active_ride.take() {
            info!(ride_id = %ride.id, state = %ride.state, "session ended with an active ride");
        }
        self.history
    }
}

/// A session shared between several command sources. Commands are serialized:
/// each closure runs with exclusive access and later ones observe its effects.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionContext>>,
}

impl SharedSession {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ctx)),
        }
    }

    pub fn with<R>(&self, command: impl FnOnce(&mut SessionContext) -> R) -> R {
        // A panic inside a previous command must not lock the user out.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        command(&mut guard)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.with(|ctx| ctx.snapshot())
    }

    /// Unwrap when this is the last handle.
    pub fn try_into_inner(self) -> Result<SessionContext, SharedSession> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|inner| SharedSession { inner })
    }
}
