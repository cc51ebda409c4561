//! Geospatial filtering of point-located entities.
//!
//! # Responsibility
//! - Compute great-circle distances between latitude/longitude pairs.
//! - Narrow point sets by circular radius or axis-aligned rectangle.
//!
//! # Invariants
//! - Every function here is pure; inputs are never mutated.
//! - Filters preserve input order and accept empty input.
//! - Coordinate range validity is the caller's responsibility; the filters
//!   never fail on numeric input.

mod filter;

pub use filter::{
    distance_meters, within_radius, within_rectangle, GeoFilter, EARTH_RADIUS_METERS,
};

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks `latitude` in `[-90, 90]` and `longitude` in `[-180, 180]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::CoordinateOutOfRange { field: "latitude" });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::CoordinateOutOfRange { field: "longitude" });
        }
        Ok(())
    }

    /// Great-circle distance to `other`, in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Closed, axis-aligned latitude/longitude rectangle.
///
/// Membership is a plain coordinate comparison. A rectangle crossing the
/// ±180° meridian cannot be expressed; `min_lon > max_lon` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Boundary-inclusive membership test.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.min_lat <= point.latitude
            && point.latitude <= self.max_lat
            && self.min_lon <= point.longitude
            && point.longitude <= self.max_lon
    }
}

/// Anything that can be placed on the map.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn location(&self) -> GeoPoint {
        (**self).location()
    }
}
