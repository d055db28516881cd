use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::pricing::FareConfig;

/// Distance assumed when the distance collaborator fails.
pub const DEFAULT_FALLBACK_DISTANCE_KM: f64 = 5.0;

/// Driver animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Progress added per tick while the driver is moving.
    pub tick_step: f64,
    /// Samples per generated route.
    pub route_points: usize,
    /// Bow height at the route midpoint as a fraction of the straight-line length.
    pub curvature: f64,
    /// Max offset (degrees, per axis) of the driver's start point from pickup.
    pub driver_start_radius_deg: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_step: 0.02,
            route_points: 50,
            curvature: 0.15,
            driver_start_radius_deg: 0.02,
        }
    }
}

/// Everything a session needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub fare: FareConfig,
    pub motion: MotionConfig,
    pub fallback_distance_km: f64,
    /// Seed for the default random source; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fare: FareConfig::default(),
            motion: MotionConfig::default(),
            fallback_distance_km: DEFAULT_FALLBACK_DISTANCE_KM,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_tick_step(mut self, tick_step: f64) -> Self {
        self.motion.tick_step = tick_step;
        self
    }

    pub fn with_curvature(mut self, curvature: f64) -> Self {
        self.motion.curvature = curvature;
        self
    }

    pub fn with_route_points(mut self, route_points: usize) -> Self {
        self.motion.route_points = route_points;
        self
    }

    pub fn with_fare(mut self, fare: FareConfig) -> Self {
        self.fare = fare;
        self
    }

    pub fn with_fallback_distance_km(mut self, distance_km: f64) -> Self {
        self.fallback_distance_km = distance_km;
        self
    }
}

/// Polling cadence for the refresh runner (simulation milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
pub struct RefreshConfig {
    /// Delay between ticks while the driver is moving.
    pub interval_ms: u64,
    /// Delay between booking and driver assignment ("finding your driver").
    pub driver_search_delay_ms: u64,
    /// Delay between arrival at pickup and trip start.
    pub boarding_delay_ms: u64,
    /// When false, the runner stops at `Arrived` and waits for an explicit start.
    pub auto_start_trip: bool,
    /// Frames kept in the rolling snapshot buffer.
    pub max_frames: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            driver_search_delay_ms: 2000,
            boarding_delay_ms: 1000,
            auto_start_trip: true,
            max_frames: 1000,
        }
    }
}
