use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ride_core::geo::GeoPoint;
use ride_core::geocoding::{GeocodeError, Geocoder};
use ride_core::random::RandomSource;

/// Replays a fixed cycle of uniform samples.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    samples: Vec<f64>,
    next: usize,
    counter: u64,
}

impl ScriptedRandom {
    pub fn new(samples: Vec<f64>) -> Self {
        assert!(!samples.is_empty(), "need at least one sample");
        Self {
            samples,
            next: 0,
            counter: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        let sample = self.samples[self.next % self.samples.len()];
        self.next += 1;
        sample
    }

    fn choose_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let sample = self.uniform();
        Some(((sample * len as f64) as usize).min(len - 1))
    }

    fn next_u64(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}

/// Geocoder that is always down, counting how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct OfflineGeocoder {
    pub calls: Arc<AtomicUsize>,
}

impl Geocoder for OfflineGeocoder {
    fn geocode(&self, _address: &str) -> Result<GeoPoint, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GeocodeError::Unavailable {
            reason: "offline".to_string(),
        })
    }
}
