//! Activity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist flat activity records and expose the lookups the hierarchy
//!   service needs (by id, roots, children, bulk, by name).
//! - Persist batches of re-leveled activities atomically.
//!
//! # Invariants
//! - Listing order is deterministic: insertion order (`rowid ASC`).
//! - `delete_activity` relies on `ON DELETE CASCADE` for descendants and
//!   organization links.
//! - Stored levels are not re-derived here; the service owns level math.
//! - `write_scope` holds the write lock from the first read to the last
//!   write, so a planned re-level cannot miss rows added concurrently.

use super::{
    contains_ignore_case, ensure_connection_ready, parse_optional_uuid, parse_uuid,
    begin_write, with_write_tx, RepoError, RepoResult,
};
use crate::model::activity::{Activity, ActivityId, NewActivity};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    parent_id,
    level
FROM activities";

const ACTIVITY_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "parent_id",
    "level",
    "created_at",
    "updated_at",
];

/// Storage contract for activity hierarchy nodes.
pub trait ActivityRepository {
    /// Inserts a new activity and returns it with its assigned id.
    fn insert_activity(&self, draft: &NewActivity) -> RepoResult<Activity>;
    /// Loads one activity by id.
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Lists root activities (`parent_id IS NULL`) with optional pagination.
    fn list_roots(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Activity>>;
    /// Lists direct children of `parent_id`.
    fn list_children(&self, parent_id: ActivityId) -> RepoResult<Vec<Activity>>;
    /// Loads every activity in one round trip.
    fn list_all(&self) -> RepoResult<Vec<Activity>>;
    /// Finds activities whose name contains `fragment`, ignoring case.
    fn find_by_name(&self, fragment: &str) -> RepoResult<Vec<Activity>>;
    /// Persists name, description, parent and level of every given activity
    /// in one atomic step. Fails with `NotFound` if any id is missing.
    fn save_activities(&self, activities: &[Activity]) -> RepoResult<()>;
    /// Deletes an activity and, through storage cascade, its subtree.
    /// Returns `false` if nothing was deleted.
    fn delete_activity(&self, id: ActivityId) -> RepoResult<bool>;
    /// Runs `body` as one exclusive write unit. Every call `body` makes on
    /// the repository joins it; an `Err` rolls all of them back.
    fn write_scope<T, E>(&self, body: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepoError>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "activities", ACTIVITY_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_activities(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_activity_row(row)?);
        }
        Ok(items)
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn insert_activity(&self, draft: &NewActivity) -> RepoResult<Activity> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO activities (
                id,
                name,
                description,
                parent_id,
                level
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                draft.name.as_str(),
                draft.description.as_deref(),
                draft.parent_id.map(|value| value.to_string()),
                i64::from(draft.level),
            ],
        )?;
        self.get_activity(id)?.ok_or(RepoError::NotFound(id))
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut items = self.query_activities(
            &format!("{ACTIVITY_SELECT_SQL} WHERE id = ?1;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(items.pop())
    }

    fn list_roots(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<Activity>> {
        let mut sql = format!("{ACTIVITY_SELECT_SQL} WHERE parent_id IS NULL ORDER BY rowid ASC");
        let mut bind_values = Vec::new();
        match limit {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            None if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            None => {}
        }
        self.query_activities(&sql, bind_values)
    }

    fn list_children(&self, parent_id: ActivityId) -> RepoResult<Vec<Activity>> {
        self.query_activities(
            &format!("{ACTIVITY_SELECT_SQL} WHERE parent_id = ?1 ORDER BY rowid ASC;"),
            vec![Value::Text(parent_id.to_string())],
        )
    }

    fn list_all(&self) -> RepoResult<Vec<Activity>> {
        self.query_activities(&format!("{ACTIVITY_SELECT_SQL} ORDER BY rowid ASC;"), Vec::new())
    }

    fn find_by_name(&self, fragment: &str) -> RepoResult<Vec<Activity>> {
        let needle = fragment.to_lowercase();
        let mut items = self.list_all()?;
        items.retain(|activity| contains_ignore_case(&activity.name, &needle));
        Ok(items)
    }

    fn save_activities(&self, activities: &[Activity]) -> RepoResult<()> {
        with_write_tx(self.conn, |conn| {
            let mut stmt = conn.prepare(
                "UPDATE activities
                 SET name = ?2,
                     description = ?3,
                     parent_id = ?4,
                     level = ?5,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
            )?;
            for activity in activities {
                let changed = stmt.execute(params![
                    activity.id.to_string(),
                    activity.name.as_str(),
                    activity.description.as_deref(),
                    activity.parent_id.map(|value| value.to_string()),
                    i64::from(activity.level),
                ])?;
                if changed == 0 {
                    return Err(RepoError::NotFound(activity.id));
                }
            }
            Ok(())
        })
    }

    fn delete_activity(&self, id: ActivityId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM activities WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn write_scope<T, E>(&self, body: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let tx = begin_write(self.conn)?;
        let value = body(self)?;
        if let Some(tx) = tx {
            tx.commit().map_err(RepoError::from)?;
        }
        Ok(value)
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "activities.id")?;
    let parent_id = parse_optional_uuid(row.get("parent_id")?, "activities.parent_id")?;

    let raw_level: i64 = row.get("level")?;
    let level = u32::try_from(raw_level).map_err(|_| {
        RepoError::InvalidData(format!("invalid level `{raw_level}` in activities.level"))
    })?;

    Ok(Activity {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
        level,
    })
}
