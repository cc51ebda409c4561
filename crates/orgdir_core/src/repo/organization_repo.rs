//! Organization repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist organizations together with their phone numbers and activity
//!   links.
//! - Provide the lookups organization search is built from: by building set,
//!   by activity set, by name fragment.
//!
//! # Invariants
//! - Create/update write the organization row, phones and links in one
//!   transaction; phones and links are replaced wholesale.
//! - Result order is deterministic: insertion order (`rowid ASC`), distinct.
//! - Id-set lookups accept any number of ids.

use super::{
    contains_ignore_case, ensure_connection_ready, parse_optional_uuid, parse_uuid,
    with_write_tx, RepoError, RepoResult,
};
use crate::model::activity::ActivityId;
use crate::model::building::BuildingId;
use crate::model::organization::{
    NewOrganization, Organization, OrganizationId, OrganizationPatch,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ORGANIZATION_SELECT_SQL: &str = "SELECT
    o.id AS id,
    o.name AS name,
    o.description AS description,
    o.building_id AS building_id,
    o.created_at AS created_at,
    o.updated_at AS updated_at
FROM organizations o";

const ORGANIZATION_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "building_id",
    "created_at",
    "updated_at",
];

/// Storage contract for organizations.
pub trait OrganizationRepository {
    fn create_organization(&self, draft: &NewOrganization) -> RepoResult<Organization>;
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    fn list_organizations(&self, limit: Option<u32>, offset: u32)
        -> RepoResult<Vec<Organization>>;
    /// Applies a normalized patch. Fails with `NotFound` if missing.
    fn update_organization(
        &self,
        id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> RepoResult<Organization>;
    /// Returns `false` if nothing was deleted.
    fn delete_organization(&self, id: OrganizationId) -> RepoResult<bool>;
    /// Organizations located in any of `building_ids`.
    fn list_by_buildings(&self, building_ids: &[BuildingId]) -> RepoResult<Vec<Organization>>;
    /// Organizations linked to any of `activity_ids`, each listed once.
    fn list_by_activities(&self, activity_ids: &[ActivityId]) -> RepoResult<Vec<Organization>>;
    /// Organizations whose name contains `fragment`, ignoring case.
    fn search_by_name(&self, fragment: &str) -> RepoResult<Vec<Organization>>;
}

/// SQLite-backed organization repository.
pub struct SqliteOrganizationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganizationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "organizations", ORGANIZATION_COLUMNS)?;
        ensure_connection_ready(
            conn,
            "organization_activities",
            &["organization_id", "activity_id"],
        )?;
        ensure_connection_ready(
            conn,
            "organization_phones",
            &["organization_id", "position", "number"],
        )?;
        Ok(Self { conn })
    }

    fn query_organizations(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<Organization>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_organization_row(row)?);
        }
        drop(rows);

        for organization in &mut items {
            load_details(self.conn, organization)?;
        }
        Ok(items)
    }
}

impl OrganizationRepository for SqliteOrganizationRepository<'_> {
    fn create_organization(&self, draft: &NewOrganization) -> RepoResult<Organization> {
        let draft = draft.normalized()?;
        let id = Uuid::new_v4();
        with_write_tx(self.conn, |conn| {
            conn.execute(
                "INSERT INTO organizations (
                    id,
                    name,
                    description,
                    building_id
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    draft.name.as_str(),
                    draft.description.as_deref(),
                    draft.building_id.map(|value| value.to_string()),
                ],
            )?;
            replace_phones(conn, id, &draft.phones)?;
            replace_activity_links(conn, id, &draft.activity_ids)?;
            Ok(())
        })?;
        self.get_organization(id)?.ok_or(RepoError::NotFound(id))
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let mut items = self.query_organizations(
            &format!("{ORGANIZATION_SELECT_SQL} WHERE o.id = ?1;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(items.pop())
    }

    fn list_organizations(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Organization>> {
        self.query_organizations(
            &format!("{ORGANIZATION_SELECT_SQL} ORDER BY o.rowid ASC LIMIT ?1 OFFSET ?2;"),
            vec![
                Value::Integer(limit.map_or(-1, i64::from)),
                Value::Integer(i64::from(offset)),
            ],
        )
    }

    fn update_organization(
        &self,
        id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> RepoResult<Organization> {
        let patch = patch.normalized()?;
        let current = self.get_organization(id)?.ok_or(RepoError::NotFound(id))?;

        let name = patch.name.clone().unwrap_or(current.name);
        let description = match patch.description {
            Some(value) => value,
            None => current.description,
        };
        let building_id = patch.building_id.unwrap_or(current.building_id);

        with_write_tx(self.conn, |conn| {
            let changed = conn.execute(
                "UPDATE organizations
                 SET name = ?2,
                     description = ?3,
                     building_id = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    name.as_str(),
                    description.as_deref(),
                    building_id.map(|value| value.to_string()),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            if let Some(phones) = &patch.phones {
                replace_phones(conn, id, phones)?;
            }
            if let Some(activity_ids) = &patch.activity_ids {
                replace_activity_links(conn, id, activity_ids)?;
            }
            Ok(())
        })?;

        self.get_organization(id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete_organization(&self, id: OrganizationId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM organizations WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn list_by_buildings(&self, building_ids: &[BuildingId]) -> RepoResult<Vec<Organization>> {
        if building_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query_organizations(
            &format!(
                "{ORGANIZATION_SELECT_SQL}
                 WHERE o.building_id IN (SELECT value FROM json_each(?1))
                 ORDER BY o.rowid ASC;"
            ),
            vec![id_array(building_ids)],
        )
    }

    fn list_by_activities(&self, activity_ids: &[ActivityId]) -> RepoResult<Vec<Organization>> {
        if activity_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query_organizations(
            &format!(
                "{ORGANIZATION_SELECT_SQL}
                 WHERE o.id IN (
                     SELECT organization_id
                     FROM organization_activities
                     WHERE activity_id IN (SELECT value FROM json_each(?1))
                 )
                 ORDER BY o.rowid ASC;"
            ),
            vec![id_array(activity_ids)],
        )
    }

    fn search_by_name(&self, fragment: &str) -> RepoResult<Vec<Organization>> {
        let needle = fragment.to_lowercase();
        let mut items = self.list_organizations(None, 0)?;
        items.retain(|organization| contains_ignore_case(&organization.name, &needle));
        Ok(items)
    }
}

fn replace_phones(conn: &Connection, id: OrganizationId, phones: &[String]) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM organization_phones WHERE organization_id = ?1;",
        [id.to_string()],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO organization_phones (organization_id, position, number)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, number) in phones.iter().enumerate() {
        stmt.execute(params![id.to_string(), position as i64, number.as_str()])?;
    }
    Ok(())
}

fn replace_activity_links(
    conn: &Connection,
    id: OrganizationId,
    activity_ids: &[ActivityId],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM organization_activities WHERE organization_id = ?1;",
        [id.to_string()],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO organization_activities (organization_id, activity_id)
         VALUES (?1, ?2);",
    )?;
    for activity_id in activity_ids {
        stmt.execute(params![id.to_string(), activity_id.to_string()])?;
    }
    Ok(())
}

fn load_details(conn: &Connection, organization: &mut Organization) -> RepoResult<()> {
    let id = organization.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT number
         FROM organization_phones
         WHERE organization_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    while let Some(row) = rows.next()? {
        organization.phones.push(row.get(0)?);
    }

    let mut stmt = conn.prepare(
        "SELECT l.activity_id
         FROM organization_activities l
         INNER JOIN activities a ON a.id = l.activity_id
         WHERE l.organization_id = ?1
         ORDER BY a.rowid ASC;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        organization
            .activity_ids
            .push(parse_uuid(&value, "organization_activities.activity_id")?);
    }
    Ok(())
}

fn parse_organization_row(row: &Row<'_>) -> RepoResult<Organization> {
    let id_text: String = row.get("id")?;
    Ok(Organization {
        id: parse_uuid(&id_text, "organizations.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        building_id: parse_optional_uuid(row.get("building_id")?, "organizations.building_id")?,
        phones: Vec::new(),
        activity_ids: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Binds an id set as one JSON array parameter, so set size never meets
/// SQLite's host parameter limit.
fn id_array(ids: &[Uuid]) -> Value {
    let items = ids
        .iter()
        .map(|id| serde_json::Value::String(id.to_string()))
        .collect();
    Value::Text(serde_json::Value::Array(items).to_string())
}
