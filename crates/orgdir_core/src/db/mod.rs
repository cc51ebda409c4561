//! Directory storage bootstrap.
//!
//! Activity subtrees, organization links and building tenants are removed by
//! foreign-key cascades, so every connection handed out here has
//! `foreign_keys=ON` and a schema at [`latest_version`].

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{latest_version, migrate, schema_version, SchemaUpgrade};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage failure below the repository layer.
#[derive(Debug)]
pub enum DbError {
    /// A write broke a foreign-key or `CHECK` rule of the directory schema.
    ConstraintViolation(rusqlite::Error),
    /// Any other SQLite failure.
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build than this one.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// `true` when storage itself refused the row.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation(err) => write!(f, "directory constraint violated: {err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "directory schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConstraintViolation(err) | Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            Self::ConstraintViolation(value)
        } else {
            Self::Sqlite(value)
        }
    }
}
