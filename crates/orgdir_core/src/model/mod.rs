//! Domain model for the organization directory.
//!
//! # Responsibility
//! - Define activity, building and organization records used by core logic.
//! - Own field-level validation shared by services and repositories.
//!
//! # Invariants
//! - Every record is identified by a stable UUID assigned at insert time.
//! - Activity `level` mirrors the depth of its parent chain.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity;
pub mod building;
pub mod organization;

/// Field-level validation failure for directory records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    Blank { field: &'static str },
    /// Text field exceeds its character budget.
    TooLong { field: &'static str, max_chars: usize },
    /// Coordinate component is NaN or outside its closed range.
    CoordinateOutOfRange { field: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::CoordinateOutOfRange { field } => write!(f, "{field} is out of range"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and checks it is non-empty and within `max_chars`.
pub(crate) fn normalize_text(
    value: &str,
    field: &'static str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}
