//! Building repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `buildings`.
//! - Expose point projections for spatial filtering, either in full or
//!   pre-filtered by a coordinate range.
//!
//! # Invariants
//! - Write paths validate address and coordinate ranges before SQL.
//! - Deleting a building deletes its organizations, and with them their
//!   phones and activity links (`ON DELETE CASCADE`).

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::geo::{BoundingBox, GeoPoint};
use crate::model::building::{Building, BuildingId, BuildingPoint, NewBuilding};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const BUILDING_SELECT_SQL: &str = "SELECT
    id,
    address,
    latitude,
    longitude,
    description
FROM buildings";

const BUILDING_COLUMNS: &[&str] = &[
    "id",
    "address",
    "latitude",
    "longitude",
    "description",
];

/// Storage contract for buildings.
pub trait BuildingRepository {
    fn create_building(&self, draft: &NewBuilding) -> RepoResult<Building>;
    fn get_building(&self, id: BuildingId) -> RepoResult<Option<Building>>;
    fn list_buildings(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Building>>;
    /// Persists every field of `building`. Fails with `NotFound` if missing.
    fn update_building(&self, building: &Building) -> RepoResult<()>;
    /// Returns `false` if nothing was deleted.
    fn delete_building(&self, id: BuildingId) -> RepoResult<bool>;
    /// Returns the coordinates of every building.
    fn list_points(&self) -> RepoResult<Vec<BuildingPoint>>;
    /// Returns building coordinates inside the closed range `bbox`.
    fn list_points_in_range(&self, bbox: &BoundingBox) -> RepoResult<Vec<BuildingPoint>>;
}

/// SQLite-backed building repository.
pub struct SqliteBuildingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBuildingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "buildings", BUILDING_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_points(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<BuildingPoint>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            points.push(BuildingPoint {
                building_id: parse_uuid(&id_text, "buildings.id")?,
                point: GeoPoint::new(row.get(1)?, row.get(2)?),
            });
        }
        Ok(points)
    }
}

impl BuildingRepository for SqliteBuildingRepository<'_> {
    fn create_building(&self, draft: &NewBuilding) -> RepoResult<Building> {
        let draft = draft.normalized()?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO buildings (
                id,
                address,
                latitude,
                longitude,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                draft.address.as_str(),
                draft.latitude,
                draft.longitude,
                draft.description.as_deref(),
            ],
        )?;
        self.get_building(id)?.ok_or(RepoError::NotFound(id))
    }

    fn get_building(&self, id: BuildingId) -> RepoResult<Option<Building>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BUILDING_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_building_row(row)?));
        }
        Ok(None)
    }

    fn list_buildings(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Building>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BUILDING_SELECT_SQL} ORDER BY rowid ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let limit = limit.map_or(-1, i64::from);
        let mut rows = stmt.query(params![limit, i64::from(offset)])?;
        let mut buildings = Vec::new();
        while let Some(row) = rows.next()? {
            buildings.push(parse_building_row(row)?);
        }
        Ok(buildings)
    }

    fn update_building(&self, building: &Building) -> RepoResult<()> {
        GeoPoint::new(building.latitude, building.longitude).validate()?;
        let changed = self.conn.execute(
            "UPDATE buildings
             SET address = ?2,
                 latitude = ?3,
                 longitude = ?4,
                 description = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                building.id.to_string(),
                building.address.as_str(),
                building.latitude,
                building.longitude,
                building.description.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(building.id));
        }
        Ok(())
    }

    fn delete_building(&self, id: BuildingId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM buildings WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn list_points(&self) -> RepoResult<Vec<BuildingPoint>> {
        self.query_points(
            "SELECT id, latitude, longitude FROM buildings ORDER BY rowid ASC;",
            Vec::new(),
        )
    }

    fn list_points_in_range(&self, bbox: &BoundingBox) -> RepoResult<Vec<BuildingPoint>> {
        self.query_points(
            "SELECT id, latitude, longitude
             FROM buildings
             WHERE latitude >= ?1
               AND latitude <= ?2
               AND longitude >= ?3
               AND longitude <= ?4
             ORDER BY rowid ASC;",
            vec![
                Value::Real(bbox.min_lat),
                Value::Real(bbox.max_lat),
                Value::Real(bbox.min_lon),
                Value::Real(bbox.max_lon),
            ],
        )
    }
}

fn parse_building_row(row: &Row<'_>) -> RepoResult<Building> {
    let id_text: String = row.get("id")?;
    Ok(Building {
        id: parse_uuid(&id_text, "buildings.id")?,
        address: row.get("address")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        description: row.get("description")?,
    })
}
