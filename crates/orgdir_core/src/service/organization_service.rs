//! Organization use-case service, including directory search.
//!
//! # Responsibility
//! - Validate organization input and referenced building/activity ids.
//! - Answer directory searches: by building, by activity subtree, by name,
//!   by activity name, by proximity and by rectangular area.
//!
//! # Invariants
//! - Activity searches always broaden to the whole descendant set.
//! - Spatial searches classify buildings through the geo filter first and
//!   only then map surviving building ids to organizations.

use crate::config::DirectoryConfig;
use crate::geo::{BoundingBox, GeoFilter, GeoPoint};
use crate::model::activity::ActivityId;
use crate::model::building::BuildingId;
use crate::model::organization::{
    NewOrganization, Organization, OrganizationId, OrganizationPatch,
};
use crate::model::ValidationError;
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::building_repo::BuildingRepository;
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::RepoError;
use crate::service::activity_service::{ActivityService, ActivityServiceError};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum OrganizationServiceError {
    Validation(ValidationError),
    NotFound(OrganizationId),
    BuildingNotFound(BuildingId),
    ActivityNotFound(ActivityId),
    /// Hierarchy lookup failed while broadening an activity search.
    Hierarchy(ActivityServiceError),
    Repo(RepoError),
}

impl Display for OrganizationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "organization not found: {id}"),
            Self::BuildingNotFound(id) => write!(f, "building not found: {id}"),
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::Hierarchy(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrganizationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Hierarchy(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OrganizationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for OrganizationServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ActivityServiceError> for OrganizationServiceError {
    fn from(value: ActivityServiceError) -> Self {
        match value {
            ActivityServiceError::NotFound(id) => Self::ActivityNotFound(id),
            other => Self::Hierarchy(other),
        }
    }
}

pub type OrganizationServiceResult<T> = Result<T, OrganizationServiceError>;

/// Organization service facade.
pub struct OrganizationService<A, B, O>
where
    A: ActivityRepository,
    B: BuildingRepository,
    O: OrganizationRepository,
{
    activities: ActivityService<A>,
    buildings: B,
    organizations: O,
    geo: GeoFilter,
}

impl<A, B, O> OrganizationService<A, B, O>
where
    A: ActivityRepository,
    B: BuildingRepository,
    O: OrganizationRepository,
{
    pub fn new(activities: A, buildings: B, organizations: O, config: &DirectoryConfig) -> Self {
        Self {
            activities: ActivityService::new(activities, config),
            buildings,
            organizations,
            geo: GeoFilter::new(config),
        }
    }

    /// Creates an organization after checking its building and activities.
    pub fn create_organization(
        &self,
        draft: &NewOrganization,
    ) -> OrganizationServiceResult<Organization> {
        let draft = draft.normalized()?;
        if let Some(building_id) = draft.building_id {
            self.ensure_building_exists(building_id)?;
        }
        self.ensure_activities_exist(&draft.activity_ids)?;

        let created = self.organizations.create_organization(&draft)?;
        info!(
            "event=organization_create module=organization status=ok organization_id={} activities={} phones={}",
            created.id,
            created.activity_ids.len(),
            created.phones.len()
        );
        Ok(created)
    }

    pub fn get_organization(&self, id: OrganizationId) -> OrganizationServiceResult<Organization> {
        self.organizations
            .get_organization(id)?
            .ok_or(OrganizationServiceError::NotFound(id))
    }

    pub fn list_organizations(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> OrganizationServiceResult<Vec<Organization>> {
        self.organizations
            .list_organizations(limit, offset)
            .map_err(Into::into)
    }

    /// Applies a partial update. Phones and activity links, when present,
    /// replace the stored collections.
    pub fn update_organization(
        &self,
        id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> OrganizationServiceResult<Organization> {
        let patch = patch.normalized()?;
        if let Some(Some(building_id)) = patch.building_id {
            self.ensure_building_exists(building_id)?;
        }
        if let Some(activity_ids) = &patch.activity_ids {
            self.ensure_activities_exist(activity_ids)?;
        }
        let updated = self.organizations.update_organization(id, &patch)?;
        info!(
            "event=organization_update module=organization status=ok organization_id={}",
            updated.id
        );
        Ok(updated)
    }

    pub fn delete_organization(&self, id: OrganizationId) -> OrganizationServiceResult<bool> {
        let deleted = self.organizations.delete_organization(id)?;
        info!(
            "event=organization_delete module=organization status=ok organization_id={} deleted={}",
            id, deleted
        );
        Ok(deleted)
    }

    /// Organizations located in one building.
    pub fn by_building(
        &self,
        building_id: BuildingId,
    ) -> OrganizationServiceResult<Vec<Organization>> {
        self.ensure_building_exists(building_id)?;
        self.organizations
            .list_by_buildings(&[building_id])
            .map_err(Into::into)
    }

    /// Organizations tagged with `activity_id` or any of its descendants.
    ///
    /// An unknown activity matches nothing.
    pub fn by_activity(
        &self,
        activity_id: ActivityId,
    ) -> OrganizationServiceResult<Vec<Organization>> {
        let ids: Vec<_> = self
            .activities
            .descendant_ids_of_all([activity_id])?
            .into_iter()
            .collect();
        self.organizations
            .list_by_activities(&ids)
            .map_err(Into::into)
    }

    /// Organizations whose name contains `fragment`, ignoring case.
    pub fn search_by_name(&self, fragment: &str) -> OrganizationServiceResult<Vec<Organization>> {
        self.organizations
            .search_by_name(fragment.trim())
            .map_err(Into::into)
    }

    /// Organizations tagged with any activity whose name contains `fragment`,
    /// or with a descendant of such an activity.
    pub fn search_by_activity_name(
        &self,
        fragment: &str,
    ) -> OrganizationServiceResult<Vec<Organization>> {
        let matched = self.activities.find_by_name(fragment)?;
        if matched.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<_> = self
            .activities
            .descendant_ids_of_all(matched.into_iter().map(|activity| activity.id))?
            .into_iter()
            .collect();
        self.organizations
            .list_by_activities(&ids)
            .map_err(Into::into)
    }

    /// Organizations in buildings within `radius_m` of `center`.
    ///
    /// `None` uses the configured default radius.
    pub fn nearby(
        &self,
        center: GeoPoint,
        radius_m: Option<f64>,
    ) -> OrganizationServiceResult<Vec<Organization>> {
        let points = self.buildings.list_points()?;
        let scanned = points.len();
        let building_ids: Vec<_> = self
            .geo
            .nearby(points, center, radius_m)
            .into_iter()
            .map(|point| point.building_id)
            .collect();
        debug!(
            "event=organization_nearby module=organization status=ok scanned={} buildings={}",
            scanned,
            building_ids.len()
        );
        self.organizations
            .list_by_buildings(&building_ids)
            .map_err(Into::into)
    }

    /// Organizations in buildings inside the closed rectangle `bbox`.
    pub fn in_area(&self, bbox: &BoundingBox) -> OrganizationServiceResult<Vec<Organization>> {
        let candidates = self.buildings.list_points_in_range(bbox)?;
        let building_ids: Vec<_> = self
            .geo
            .in_area(candidates, bbox)
            .into_iter()
            .map(|point| point.building_id)
            .collect();
        self.organizations
            .list_by_buildings(&building_ids)
            .map_err(Into::into)
    }

    fn ensure_building_exists(&self, building_id: BuildingId) -> OrganizationServiceResult<()> {
        match self.buildings.get_building(building_id)? {
            Some(_) => Ok(()),
            None => Err(OrganizationServiceError::BuildingNotFound(building_id)),
        }
    }

    fn ensure_activities_exist(&self, activity_ids: &[ActivityId]) -> OrganizationServiceResult<()> {
        for activity_id in activity_ids {
            self.activities.get_activity(*activity_id)?;
        }
        Ok(())
    }
}
