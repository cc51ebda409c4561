//! Core domain logic for the organization directory.
//! This crate is the single source of truth for hierarchy and geo invariants.

pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DirectoryConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use geo::{
    distance_meters, within_radius, within_rectangle, BoundingBox, GeoFilter, GeoPoint, Located,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{Activity, ActivityId, ActivityNode, ActivityPatch, NewActivity};
pub use model::building::{Building, BuildingId, BuildingPatch, BuildingPoint, NewBuilding};
pub use model::organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch};
pub use model::ValidationError;
pub use repo::activity_repo::{ActivityRepository, SqliteActivityRepository};
pub use repo::building_repo::{BuildingRepository, SqliteBuildingRepository};
pub use repo::organization_repo::{OrganizationRepository, SqliteOrganizationRepository};
pub use repo::{RepoError, RepoResult};
pub use service::activity_service::{ActivityService, ActivityServiceError, ActivityServiceResult};
pub use service::building_service::{BuildingService, BuildingServiceError};
pub use service::organization_service::{
    OrganizationService, OrganizationServiceError, OrganizationServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
