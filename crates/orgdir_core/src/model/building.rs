//! Building model.
//!
//! # Responsibility
//! - Define the building record that anchors organizations to a location.
//! - Validate address and coordinate ranges before persistence.
//!
//! # Invariants
//! - `latitude` in `[-90, 90]`, `longitude` in `[-180, 180]`.
//! - `address` is non-blank and at most 500 characters.

use super::{normalize_text, ValidationError};
use crate::geo::{GeoPoint, Located};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable building identifier.
pub type BuildingId = Uuid;

pub const BUILDING_ADDRESS_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

impl Building {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl Located for Building {
    fn location(&self) -> GeoPoint {
        self.point()
    }
}

/// Minimal projection used by spatial search: id and coordinates only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingPoint {
    pub building_id: BuildingId,
    pub point: GeoPoint,
}

impl Located for BuildingPoint {
    fn location(&self) -> GeoPoint {
        self.point
    }
}

/// Insert payload for a new building.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuilding {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

impl NewBuilding {
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
            description: None,
        }
    }

    /// Returns a normalized copy or the first field that fails validation.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        GeoPoint::new(self.latitude, self.longitude).validate()?;
        Ok(Self {
            address: normalize_building_address(&self.address)?,
            latitude: self.latitude,
            longitude: self.longitude,
            description: self.description.clone(),
        })
    }
}

/// Partial update for a building. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingPatch {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<Option<String>>,
}

impl BuildingPatch {
    /// Applies this patch on top of `current`, validating the result.
    pub fn apply_to(&self, current: &Building) -> Result<Building, ValidationError> {
        let address = match self.address.as_deref() {
            Some(value) => normalize_building_address(value)?,
            None => current.address.clone(),
        };
        let latitude = self.latitude.unwrap_or(current.latitude);
        let longitude = self.longitude.unwrap_or(current.longitude);
        GeoPoint::new(latitude, longitude).validate()?;

        Ok(Building {
            id: current.id,
            address,
            latitude,
            longitude,
            description: match &self.description {
                Some(value) => value.clone(),
                None => current.description.clone(),
            },
        })
    }
}

pub fn normalize_building_address(value: &str) -> Result<String, ValidationError> {
    normalize_text(value, "building address", BUILDING_ADDRESS_MAX_CHARS)
}
