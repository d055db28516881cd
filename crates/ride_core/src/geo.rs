//! Geographic primitives: coordinates, sampled routes and great-circle distance.
//!
//! This module provides:
//!
//! - **GeoPoint**: validated latitude/longitude pair in degrees
//! - **Route**: ordered, non-empty sample of points from origin to destination
//! - **route_between**: linear interpolation with an optional `sin(t·π)` bow
//! - **position_at**: point on a route for a progress fraction in `[0, 1]`
//!
//! Routes are synthetic: there is no road network, only a smooth curve that
//! looks plausible on a map.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RideError;

/// Immutable latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, RideError> {
        h3o::LatLng::new(lat, lng)
            .map_err(|err| RideError::Validation(format!("invalid coordinate: {err}")))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RideError::Validation(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(RideError::Validation(format!(
                "longitude {lng} outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Constant constructor for known-good literals (gazetteer entries, defaults).
    pub(crate) const fn from_degrees(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a point after clamping latitude and longitude into range.
    /// Non-finite inputs collapse to zero.
    pub fn clamped(lat: f64, lng: f64) -> Self {
        let lat = if lat.is_finite() { lat.clamp(-90.0, 90.0) } else { 0.0 };
        let lng = if lng.is_finite() { lng.clamp(-180.0, 180.0) } else { 0.0 };
        Self { lat, lng }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle (haversine) distance to `other` in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        match (self.to_lat_lng(), other.to_lat_lng()) {
            (Some(a), Some(b)) => a.distance_km(b),
            _ => 0.0,
        }
    }

    /// Convert to an h3o coordinate; only fails for non-finite values, which
    /// the constructors never produce.
    pub fn to_lat_lng(&self) -> Option<h3o::LatLng> {
        h3o::LatLng::new(self.lat, self.lng).ok()
    }

    /// Midpoint in coordinate space; good enough for centring a city map.
    pub fn midpoint(&self, other: &GeoPoint) -> GeoPoint {
        GeoPoint {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }
}

impl From<h3o::LatLng> for GeoPoint {
    fn from(ll: h3o::LatLng) -> Self {
        GeoPoint::clamped(ll.lat(), ll.lng())
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Side of the straight line a curved route bows towards, seen from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bend {
    #[default]
    Left,
    Right,
}

impl Bend {
    /// Pick a side from a uniform sample in `[0, 1)`.
    pub fn from_uniform(sample: f64) -> Self {
        if sample < 0.5 {
            Bend::Left
        } else {
            Bend::Right
        }
    }

    fn sign(self) -> f64 {
        match self {
            Bend::Left => 1.0,
            Bend::Right => -1.0,
        }
    }
}

/// Ordered sample of points from origin (first) to destination (last).
/// Never empty; deserialization goes through [`Route::from_points`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoutePoints")]
pub struct Route {
    points: Vec<GeoPoint>,
}

#[derive(Deserialize)]
struct RoutePoints {
    points: Vec<GeoPoint>,
}

impl TryFrom<RoutePoints> for Route {
    type Error = String;

    fn try_from(raw: RoutePoints) -> Result<Self, Self::Error> {
        Route::from_points(raw.points).ok_or_else(|| "a route needs at least one point".to_string())
    }
}

impl Route {
    /// Wrap an explicit list of points. Returns `None` when `points` is empty.
    pub fn from_points(points: Vec<GeoPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn origin(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn destination(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    /// Sum of great-circle distances between consecutive samples.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_km(&pair[1]))
            .sum()
    }

    /// See [`position_at`].
    pub fn position_at(&self, progress: f64) -> GeoPoint {
        position_at(self, progress)
    }
}

/// Sample `num_points` points between `start` and `end`, bowing to the left.
///
/// `curvature` is the height of the bow at the midpoint as a fraction of the
/// straight-line length; `0.0` yields plain linear interpolation.
pub fn route_between(
    start: GeoPoint,
    end: GeoPoint,
    num_points: usize,
    curvature: f64,
) -> Result<Route, RideError> {
    route_between_with_bend(start, end, num_points, curvature, Bend::Left)
}

/// Like [`route_between`], with an explicit side for the bow.
pub fn route_between_with_bend(
    start: GeoPoint,
    end: GeoPoint,
    num_points: usize,
    curvature: f64,
    bend: Bend,
) -> Result<Route, RideError> {
    if num_points < 2 {
        return Err(RideError::Validation(format!(
            "a route needs at least 2 points, got {num_points}"
        )));
    }
    if !curvature.is_finite() || curvature < 0.0 {
        return Err(RideError::Validation(format!(
            "curvature must be finite and >= 0, got {curvature}"
        )));
    }

    let d_lat = end.lat - start.lat;
    let d_lng = end.lng - start.lng;
    let chord = (d_lat * d_lat + d_lng * d_lng).sqrt();
    // Unit normal pointing left of the direction of travel.
    let (n_lat, n_lng) = if chord > 0.0 {
        (d_lng / chord, -d_lat / chord)
    } else {
        (0.0, 0.0)
    };
    let amplitude = curvature * chord * bend.sign();

    let last = num_points - 1;
    let mut points = Vec::with_capacity(num_points);
    points.push(start);
    for i in 1..last {
        let t = i as f64 / last as f64;
        let offset = amplitude * (t * PI).sin();
        points.push(GeoPoint::clamped(
            start.lat + d_lat * t + n_lat * offset,
            start.lng + d_lng * t + n_lng * offset,
        ));
    }
    points.push(end);

    Ok(Route { points })
}

/// Point on `route` at `progress`, interpolating between neighbouring samples.
/// `progress` is clamped to `[0, 1]`; NaN is treated as `0`.
pub fn position_at(route: &Route, progress: f64) -> GeoPoint {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    let last = route.points.len() - 1;
    if last == 0 || progress <= 0.0 {
        return route.points[0];
    }
    if progress >= 1.0 {
        return route.points[last];
    }

    let scaled = progress * last as f64;
    let index = (scaled.floor() as usize).min(last - 1);
    let frac = scaled - index as f64;
    let a = route.points[index];
    let b = route.points[index + 1];
    GeoPoint::clamped(
        a.lat + (b.lat - a.lat) * frac,
        a.lng + (b.lng - a.lng) * frac,
    )
}
