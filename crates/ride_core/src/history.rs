//! Ride history ledger: append-only record of archived rides, plus a few KPIs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RideError;
use crate::geo::GeoPoint;
use crate::pricing::{PaymentMethod, RideTier};

/// Star rating in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Out-of-range values are rejected, never clamped.
    pub fn new(stars: u8) -> Result<Self, RideError> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RideError::Validation(format!(
                "rating must be between {} and {}, got {stars}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl PartialEq<u8> for Rating {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

/// Snapshot of a completed ride, taken when it is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideHistoryEntry {
    pub ride_id: Uuid,
    /// When the ride completed.
    pub timestamp: DateTime<Utc>,
    pub driver_name: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub distance_km: f64,
    pub fare: f64,
    pub tier: RideTier,
    pub payment: PaymentMethod,
    pub rating: Rating,
    pub feedback: Option<String>,
}

/// Insertion order is chronological order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RideHistory {
    entries: Vec<RideHistoryEntry>,
}

impl RideHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, entry: RideHistoryEntry) -> &RideHistoryEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[RideHistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RideHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&RideHistoryEntry> {
        self.entries.last()
    }

    pub fn total_spent(&self) -> f64 {
        self.entries.iter().map(|entry| entry.fare).sum()
    }

    /// Mean star rating given, `None` with no rides.
    pub fn average_rating(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let total: u32 = self
            .entries
            .iter()
            .map(|entry| u32::from(entry.rating.stars()))
            .sum();
        Some(f64::from(total) / self.entries.len() as f64)
    }

    pub fn rides_per_driver(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for entry in &self.entries {
            *counts.entry(entry.driver_name.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
