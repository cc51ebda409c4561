//! Building use-case service.
//!
//! # Responsibility
//! - Validate building input and orchestrate building CRUD.
//!
//! # Invariants
//! - Coordinates are range-checked before any write.

use crate::model::building::{Building, BuildingId, BuildingPatch, NewBuilding};
use crate::model::ValidationError;
use crate::repo::building_repo::BuildingRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum BuildingServiceError {
    Validation(ValidationError),
    NotFound(BuildingId),
    Repo(RepoError),
}

impl Display for BuildingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "building not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BuildingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for BuildingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for BuildingServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Building service facade.
pub struct BuildingService<R: BuildingRepository> {
    repo: R,
}

impl<R: BuildingRepository> BuildingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_building(&self, draft: &NewBuilding) -> Result<Building, BuildingServiceError> {
        let draft = draft.normalized()?;
        let building = self.repo.create_building(&draft)?;
        info!(
            "event=building_create module=building status=ok building_id={}",
            building.id
        );
        Ok(building)
    }

    pub fn get_building(&self, id: BuildingId) -> Result<Building, BuildingServiceError> {
        self.repo
            .get_building(id)?
            .ok_or(BuildingServiceError::NotFound(id))
    }

    pub fn list_buildings(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Building>, BuildingServiceError> {
        self.repo.list_buildings(limit, offset).map_err(Into::into)
    }

    /// Applies a partial update and returns the stored result.
    pub fn update_building(
        &self,
        id: BuildingId,
        patch: &BuildingPatch,
    ) -> Result<Building, BuildingServiceError> {
        let current = self.get_building(id)?;
        let updated = patch.apply_to(&current)?;
        self.repo.update_building(&updated)?;
        Ok(updated)
    }

    /// Deletes a building together with the organizations housed in it.
    pub fn delete_building(&self, id: BuildingId) -> Result<bool, BuildingServiceError> {
        let deleted = self.repo.delete_building(id)?;
        info!(
            "event=building_delete module=building status=ok building_id={} deleted={}",
            id, deleted
        );
        Ok(deleted)
    }
}
