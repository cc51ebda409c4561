//! Versioned directory schema.
//!
//! The applied version lives in `PRAGMA user_version`. Each step is one SQL
//! file; pending steps run in one transaction, so a failed upgrade leaves the
//! file at its previous version.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// `(version, sql)` pairs in strictly increasing version order.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Version range crossed by one [`migrate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaUpgrade {
    pub from: u32,
    pub to: u32,
}

impl SchemaUpgrade {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Newest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Schema version recorded in the connected database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the connected database up to [`latest_version`].
///
/// Databases from a newer build are refused untouched.
pub fn migrate(conn: &mut Connection) -> DbResult<SchemaUpgrade> {
    let upgrade = SchemaUpgrade {
        from: schema_version(conn)?,
        to: latest_version(),
    };
    if upgrade.from > upgrade.to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: upgrade.from,
            latest_supported: upgrade.to,
        });
    }
    if upgrade.is_noop() {
        return Ok(upgrade);
    }

    let tx = conn.transaction()?;
    for (version, sql) in SCHEMA_STEPS
        .iter()
        .filter(|(version, _)| *version > upgrade.from)
    {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", *version)?;
    }
    tx.commit()?;
    Ok(upgrade)
}
