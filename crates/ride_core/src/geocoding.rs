//! Pluggable location collaborators: address lookup and distance.
//!
//! Implementations:
//!
//! - **`GazetteerGeocoder`**: Offline table of well-known New York places. Default.
//! - **`CachedGeocoder`**: LRU wrapper around any geocoder; caches successes only.
//! - **`NominatimGeocoder`** (feature `nominatim`): OpenStreetMap search endpoint
//!   over blocking HTTP with a hard timeout.
//! - **`HaversineDistance`**: Great-circle distance, never fails for valid points.
//!
//! Both traits are object-safe and `Send + Sync` so a session can hold them as
//! boxed collaborators and tests can swap in doubles.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use thiserror::Error;

use crate::geo::GeoPoint;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("address not found: {address}")]
    NotFound { address: String },
    #[error("geocoder unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("distance unavailable: {reason}")]
pub struct DistanceError {
    pub reason: String,
}

impl DistanceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Resolves free-text addresses to coordinates.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

/// Distance between two points in kilometres.
pub trait DistanceProvider: Send + Sync {
    fn distance_km(&self, a: GeoPoint, b: GeoPoint) -> Result<f64, DistanceError>;
}

// ---------------------------------------------------------------------------
// Haversine distance (always available)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineDistance;

impl DistanceProvider for HaversineDistance {
    fn distance_km(&self, a: GeoPoint, b: GeoPoint) -> Result<f64, DistanceError> {
        Ok(a.distance_km(&b))
    }
}

// ---------------------------------------------------------------------------
// Gazetteer geocoder
// ---------------------------------------------------------------------------

/// Map centre used when nothing better is known (Lower Manhattan).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::from_degrees(40.7128, -74.0060);

/// Popular pickup/drop-off places offered by the booking form.
pub const POPULAR_LOCATIONS: &[(&str, GeoPoint)] = &[
    ("Times Square", GeoPoint::from_degrees(40.7580, -73.9855)),
    ("Central Park", GeoPoint::from_degrees(40.7829, -73.9654)),
    ("Empire State Building", GeoPoint::from_degrees(40.7484, -73.9857)),
    ("Brooklyn Bridge", GeoPoint::from_degrees(40.7061, -73.9969)),
    ("Grand Central Terminal", GeoPoint::from_degrees(40.7527, -73.9772)),
    ("Statue of Liberty", GeoPoint::from_degrees(40.6892, -74.0445)),
    ("Madison Square Garden", GeoPoint::from_degrees(40.7505, -73.9934)),
    ("Metropolitan Museum of Art", GeoPoint::from_degrees(40.7794, -73.9632)),
    ("Rockefeller Center", GeoPoint::from_degrees(40.7587, -73.9787)),
    ("One World Trade Center", GeoPoint::from_degrees(40.7127, -74.0134)),
];

/// Offline lookup over a fixed list of named places.
///
/// Matching is case-insensitive on the part of the address before the first
/// comma, so `"Times Square"` and `"times square, New York"` both resolve.
#[derive(Debug, Clone)]
pub struct GazetteerGeocoder {
    places: Vec<(String, GeoPoint)>,
}

impl GazetteerGeocoder {
    pub fn new() -> Self {
        Self {
            places: Vec::new(),
        }
    }

    pub fn with_place(mut self, name: impl Into<String>, point: GeoPoint) -> Self {
        self.places.push((normalize(&name.into()), point));
        self
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Default for GazetteerGeocoder {
    fn default() -> Self {
        POPULAR_LOCATIONS
            .iter()
            .fold(Self::new(), |gazetteer, (name, point)| {
                gazetteer.with_place(*name, *point)
            })
    }
}

fn normalize(address: &str) -> String {
    address
        .split(',')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Geocoder for GazetteerGeocoder {
    fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let key = normalize(address);
        if key.is_empty() {
            return Err(GeocodeError::NotFound {
                address: address.to_string(),
            });
        }
        self.places
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, point)| *point)
            .ok_or_else(|| GeocodeError::NotFound {
                address: address.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// LRU-cached wrapper around any [`Geocoder`].
///
/// Cache key is the trimmed, lowercased address. Failures are not cached so a
/// transient outage does not poison later lookups.
pub struct CachedGeocoder {
    inner: Box<dyn Geocoder>,
    cache: Mutex<LruCache<String, GeoPoint>>,
}

impl CachedGeocoder {
    pub fn new(inner: Box<dyn Geocoder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Geocoder for CachedGeocoder {
    fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let key = address.trim().to_lowercase();

        // Fast path: cache hit
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(point) = cache.get(&key) {
                return Ok(*point);
            }
        }

        let point = self.inner.geocode(address)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, point);
        Ok(point)
    }
}

// ---------------------------------------------------------------------------
// Nominatim geocoder (behind `nominatim` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "nominatim")]
pub mod nominatim {
    use super::*;
    use reqwest::blocking::Client;
    use serde::Deserialize;
    use std::time::Duration;

    pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

    /// Geocodes via a Nominatim `/search` endpoint.
    pub struct NominatimGeocoder {
        client: Client,
        endpoint: String,
    }

    impl NominatimGeocoder {
        pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GeocodeError> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(concat!("ride_core/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|err| GeocodeError::Unavailable {
                    reason: err.to_string(),
                })?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            })
        }
    }

    #[derive(Deserialize)]
    struct SearchHit {
        lat: String,
        lon: String,
    }

    impl Geocoder for NominatimGeocoder {
        fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
            let unavailable = |err: reqwest::Error| GeocodeError::Unavailable {
                reason: err.to_string(),
            };
            let hits: Vec<SearchHit> = self
                .client
                .get(format!("{}/search", self.endpoint))
                .query(&[("q", address), ("format", "json"), ("limit", "1")])
                .send()
                .and_then(|resp| resp.error_for_status())
                .map_err(unavailable)?
                .json()
                .map_err(unavailable)?;

            let not_found = || GeocodeError::NotFound {
                address: address.to_string(),
            };
            let hit = hits.into_iter().next().ok_or_else(not_found)?;
            let lat: f64 = hit.lat.parse().map_err(|_| not_found())?;
            let lng: f64 = hit.lon.parse().map_err(|_| not_found())?;
            GeoPoint::new(lat, lng).map_err(|_| not_found())
        }
    }
}
