use super::{BoundingBox, GeoPoint, Located};
use crate::config::DirectoryConfig;
use log::debug;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters on a spherical Earth.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal pairs.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Keeps every point whose distance to `center` is at most `radius_m`.
pub fn within_radius<I, T>(points: I, center: GeoPoint, radius_m: f64) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Located,
{
    points
        .into_iter()
        .filter(|point| point.location().distance_to(&center) <= radius_m)
        .collect()
}

/// Keeps every point inside the closed rectangle `bbox`.
///
/// No wraparound at the ±180° meridian.
pub fn within_rectangle<I, T>(points: I, bbox: &BoundingBox) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Located,
{
    points
        .into_iter()
        .filter(|point| bbox.contains(&point.location()))
        .collect()
}

/// Geo filter bound to a configured default search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    default_radius_m: f64,
}

impl GeoFilter {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            default_radius_m: config.default_search_radius_m,
        }
    }

    pub fn default_radius_m(&self) -> f64 {
        self.default_radius_m
    }

    /// Resolves an optional caller radius against the configured default.
    pub fn radius_or_default(&self, radius_m: Option<f64>) -> f64 {
        radius_m.unwrap_or(self.default_radius_m)
    }

    /// [`within_radius`] with the default radius applied when `radius_m` is `None`.
    pub fn nearby<I, T>(&self, points: I, center: GeoPoint, radius_m: Option<f64>) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        T: Located,
    {
        let radius_m = self.radius_or_default(radius_m);
        let matched = within_radius(points, center, radius_m);
        debug!(
            "event=geo_nearby module=geo status=ok radius_m={} matched={}",
            radius_m,
            matched.len()
        );
        matched
    }

    pub fn in_area<I, T>(&self, points: I, bbox: &BoundingBox) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        T: Located,
    {
        let matched = within_rectangle(points, bbox);
        debug!(
            "event=geo_in_area module=geo status=ok matched={}",
            matched.len()
        );
        matched
    }
}

impl Default for GeoFilter {
    fn default() -> Self {
        Self::new(&DirectoryConfig::default())
    }
}
