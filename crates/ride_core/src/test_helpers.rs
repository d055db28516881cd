//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures so unit and integration tests build
//! sessions the same way.

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::config::SessionConfig;
use crate::geo::GeoPoint;
use crate::geocoding::POPULAR_LOCATIONS;
use crate::ride::LifecycleState;
use crate::session::{SessionContext, UserIdentity};

/// Fixed start time for manual clocks: 2024-06-01 09:00:00 UTC.
pub fn test_start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn test_identity() -> UserIdentity {
    UserIdentity::new("test-rider")
}

/// Coordinates of a named gazetteer place.
///
/// # Panics
///
/// Panics if `name` is not one of [`POPULAR_LOCATIONS`].
pub fn place(name: &str) -> GeoPoint {
    POPULAR_LOCATIONS
        .iter()
        .find(|(place, _)| *place == name)
        .map(|(_, point)| *point)
        .unwrap_or_else(|| panic!("unknown test place {name}"))
}

pub fn times_square() -> GeoPoint {
    place("Times Square")
}

pub fn central_park() -> GeoPoint {
    place("Central Park")
}

/// Session with the demo fleet, a manual clock at [`test_start_time`] and a seeded RNG.
///
/// # Panics
///
/// Panics if `config` fails validation.
pub fn session_with_config(identity: UserIdentity, config: SessionConfig) -> SessionContext {
    SessionContext::builder(identity)
        .config(config)
        .clock(ManualClock::starting_at(test_start_time()))
        .build()
        .expect("test session config must be valid")
}

pub fn seeded_session(seed: u64) -> SessionContext {
    session_with_config(test_identity(), SessionConfig::default().with_seed(seed))
}

/// Tick until the active ride leaves `state`, returning the number of ticks.
/// Gives up after `max_ticks`.
pub fn tick_while(ctx: &mut SessionContext, state: LifecycleState, max_ticks: usize) -> usize {
    let mut ticks = 0;
    while ticks < max_ticks && ctx.state() == Some(state) {
        ctx.tick();
        ticks += 1;
    }
    ticks
}

/// Drive the active ride from `Requested` to `Completed`.
///
/// # Panics
///
/// Panics if any command fails.
pub fn drive_to_completion(ctx: &mut SessionContext) {
    ctx.assign_driver().expect("assign driver");
    ctx.begin_en_route().expect("begin en route");
    tick_while(ctx, LifecycleState::EnRoute, 10_000);
    ctx.start_trip().expect("start trip");
    tick_while(ctx, LifecycleState::InProgress, 10_000);
}
