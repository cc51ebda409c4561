//! Organization model.
//!
//! # Responsibility
//! - Define the organization record with its phones and activity links.
//! - Validate names and phone numbers before persistence.
//!
//! # Invariants
//! - `name` is non-blank and at most 255 characters.
//! - Each phone number is non-blank and at most 50 characters.
//! - `activity_ids` holds no duplicates.

use super::activity::ActivityId;
use super::building::BuildingId;
use super::{normalize_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable organization identifier.
pub type OrganizationId = Uuid;

pub const ORGANIZATION_NAME_MAX_CHARS: usize = 255;
pub const PHONE_NUMBER_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub building_id: Option<BuildingId>,
    /// Phone numbers in insertion order.
    pub phones: Vec<String>,
    pub activity_ids: Vec<ActivityId>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Insert payload for a new organization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub building_id: Option<BuildingId>,
    pub phones: Vec<String>,
    pub activity_ids: Vec<ActivityId>,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: normalize_organization_name(&self.name)?,
            description: self.description.clone(),
            building_id: self.building_id,
            phones: normalize_phones(&self.phones)?,
            activity_ids: dedup_ids(&self.activity_ids),
        })
    }
}

/// Partial update for an organization.
///
/// `phones` and `activity_ids` replace the whole collection when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub building_id: Option<Option<BuildingId>>,
    pub phones: Option<Vec<String>>,
    pub activity_ids: Option<Vec<ActivityId>>,
}

impl OrganizationPatch {
    /// Returns a copy with every present field normalized.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: self
                .name
                .as_deref()
                .map(normalize_organization_name)
                .transpose()?,
            description: self.description.clone(),
            building_id: self.building_id,
            phones: self.phones.as_deref().map(normalize_phones).transpose()?,
            activity_ids: self.activity_ids.as_deref().map(dedup_ids),
        })
    }
}

pub fn normalize_organization_name(value: &str) -> Result<String, ValidationError> {
    normalize_text(value, "organization name", ORGANIZATION_NAME_MAX_CHARS)
}

fn normalize_phones(phones: &[String]) -> Result<Vec<String>, ValidationError> {
    phones
        .iter()
        .map(|phone| normalize_text(phone, "phone number", PHONE_NUMBER_MAX_CHARS))
        .collect()
}

fn dedup_ids(ids: &[ActivityId]) -> Vec<ActivityId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
