//! Fare and ETA estimation.

use serde::{Deserialize, Serialize};

/// Base fare in currency units (e.g., dollars).
pub const BASE_FARE: f64 = 5.0;

/// Per-kilometer rate in currency units.
pub const PER_KM_RATE: f64 = 2.0;

/// Average city speed used for duration estimates.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareConfig {
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub average_speed_kmh: f64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            base_fare: BASE_FARE,
            per_km_rate: PER_KM_RATE,
            average_speed_kmh: AVERAGE_SPEED_KMH,
        }
    }
}

impl FareConfig {
    /// Formula: `fare = base_fare + distance_km * per_km_rate`.
    ///
    /// Negative or NaN distances are treated as zero, so the result is never
    /// below `base_fare`.
    pub fn estimate_fare(&self, distance_km: f64) -> f64 {
        self.base_fare + sanitize_distance(distance_km) * self.per_km_rate
    }

    /// Minutes at `average_speed_kmh`, rounded; at least 1 for any positive distance.
    pub fn estimate_duration_minutes(&self, distance_km: f64) -> u32 {
        let distance_km = sanitize_distance(distance_km);
        if distance_km <= 0.0 {
            return 0;
        }
        let minutes = (distance_km / self.average_speed_kmh * 60.0).round();
        (minutes as u32).max(1)
    }

    pub fn quote(&self, distance_km: f64, tier: RideTier) -> FareQuote {
        let distance_km = sanitize_distance(distance_km);
        let base = self.estimate_fare(distance_km);
        FareQuote {
            tier,
            distance_km,
            fare: (base * tier.multiplier()).max(self.base_fare),
            eta_minutes: self.estimate_duration_minutes(distance_km),
        }
    }
}

fn sanitize_distance(distance_km: f64) -> f64 {
    if distance_km.is_nan() {
        0.0
    } else {
        distance_km.max(0.0)
    }
}

/// [`FareConfig::estimate_fare`] with the default rates.
pub fn estimate_fare(distance_km: f64) -> f64 {
    FareConfig::default().estimate_fare(distance_km)
}

/// [`FareConfig::estimate_duration_minutes`] with the default average speed.
pub fn estimate_duration_minutes(distance_km: f64) -> u32 {
    FareConfig::default().estimate_duration_minutes(distance_km)
}

/// Vehicle class offered at booking; scales the distance fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RideTier {
    #[default]
    Standard,
    Comfort,
    Premium,
}

impl RideTier {
    pub const ALL: [RideTier; 3] = [RideTier::Standard, RideTier::Comfort, RideTier::Premium];

    pub fn multiplier(self) -> f64 {
        match self {
            RideTier::Standard => 1.0,
            RideTier::Comfort => 1.2,
            RideTier::Premium => 1.5,
        }
    }
}

/// How the rider settles the fare. Recorded only; no money moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Card,
    PayPal,
    Cash,
}

/// Price and duration offered for one tier, computed once at booking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    pub tier: RideTier,
    pub distance_km: f64,
    pub fare: f64,
    pub eta_minutes: u32,
}
