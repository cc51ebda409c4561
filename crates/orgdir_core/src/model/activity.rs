//! Activity classification model.
//!
//! # Responsibility
//! - Define the flat activity record persisted by storage.
//! - Define the nested tree read model assembled from flat records.
//!
//! # Invariants
//! - `level == 0` iff `parent_id.is_none()`.
//! - `level == parent.level + 1` whenever a parent exists.
//! - `level < max_activity_level` from [`crate::config::DirectoryConfig`].
//! - `parent_id != Some(id)`.

use super::{normalize_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable activity identifier.
pub type ActivityId = Uuid;

/// Upper bound for activity names, in characters.
pub const ACTIVITY_NAME_MAX_CHARS: usize = 255;

/// Flat activity record as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub description: Option<String>,
    /// `None` for root activities.
    pub parent_id: Option<ActivityId>,
    /// Zero-based depth in the hierarchy.
    pub level: u32,
}

impl Activity {
    /// Returns whether this activity sits at the top of the hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Insert payload for a new activity. Storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<ActivityId>,
    pub level: u32,
}

/// Partial update for an activity.
///
/// `None` leaves a field unchanged. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    /// New parent. Moving an activity back to the root is not expressible.
    pub parent_id: Option<ActivityId>,
}

impl ActivityPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn move_under(parent_id: ActivityId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }
}

/// Activity with its subtree attached, produced by tree reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityNode {
    #[serde(flatten)]
    pub activity: Activity,
    pub children: Vec<ActivityNode>,
}

impl ActivityNode {
    /// Counts this node and every node below it.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ActivityNode::subtree_len)
            .sum::<usize>()
    }
}

/// Normalizes an activity name: trimmed, non-empty, bounded.
pub fn normalize_activity_name(value: &str) -> Result<String, ValidationError> {
    normalize_text(value, "activity name", ACTIVITY_NAME_MAX_CHARS)
}
