//! Activity hierarchy use-case service.
//!
//! # Responsibility
//! - Validate hierarchy invariants above the repository layer.
//! - Provide create, update (including re-parenting), delete, descendant
//!   lookup and tree assembly for activities.
//!
//! # Invariants
//! - `level == 0` iff no parent, otherwise `level == parent.level + 1`.
//! - `level < max_activity_level` for every stored activity.
//! - A move validates the deepest resulting level of the whole subtree before
//!   any row is written; all re-leveled rows are saved in one batch.
//! - Create and update read, validate and write inside one repository
//!   `write_scope`, so the hierarchy they plan against cannot change under
//!   them.
//! - Traversals are capped at `max_activity_level` generations; exceeding the
//!   cap is reported as `InvariantViolation`, never looped on.

use crate::config::DirectoryConfig;
use crate::model::activity::{
    normalize_activity_name, Activity, ActivityId, ActivityNode, ActivityPatch, NewActivity,
};
use crate::model::ValidationError;
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::RepoError;
use crate::service::activity_forest::{ActivityForest, ForestError};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from activity hierarchy operations.
#[derive(Debug)]
pub enum ActivityServiceError {
    /// Name is blank or too long.
    InvalidName(ValidationError),
    /// Referenced activity (subject or parent) does not exist.
    NotFound(ActivityId),
    /// Activity was assigned itself as parent.
    SelfParent(ActivityId),
    /// Operation would place a node at or beyond the configured depth bound.
    DepthExceeded { level: u32, max_level: u32 },
    /// Requested parent lies inside the activity's own subtree.
    CycleDetected {
        activity_id: ActivityId,
        parent_id: ActivityId,
    },
    /// Stored hierarchy is internally inconsistent.
    InvariantViolation(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for ActivityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "activity not found: {id}"),
            Self::SelfParent(id) => write!(f, "activity cannot be its own parent: {id}"),
            Self::DepthExceeded { level, max_level } => write!(
                f,
                "activity level {level} exceeds hierarchy bound (max level count {max_level})"
            ),
            Self::CycleDetected {
                activity_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: activity {activity_id} under parent {parent_id}"
            ),
            Self::InvariantViolation(message) => {
                write!(f, "activity hierarchy invariant violated: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ActivityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ActivityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::InvalidName(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ForestError> for ActivityServiceError {
    fn from(value: ForestError) -> Self {
        Self::InvariantViolation(value.to_string())
    }
}

pub type ActivityServiceResult<T> = Result<T, ActivityServiceError>;

/// Activity hierarchy service facade.
pub struct ActivityService<R: ActivityRepository> {
    repo: R,
    max_level: u32,
}

impl<R: ActivityRepository> ActivityService<R> {
    /// Creates service from repository implementation and configuration.
    pub fn new(repo: R, config: &DirectoryConfig) -> Self {
        Self {
            repo,
            max_level: config.max_activity_level,
        }
    }

    /// Configured number of hierarchy levels.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Creates one activity as a root or under an existing parent.
    pub fn create_activity(
        &self,
        name: &str,
        description: Option<String>,
        parent_id: Option<ActivityId>,
    ) -> ActivityServiceResult<Activity> {
        let name = normalize_activity_name(name).map_err(ActivityServiceError::InvalidName)?;

        let created = self.repo.write_scope(|repo| -> ActivityServiceResult<Activity> {
            let level = match parent_id {
                Some(parent_id) => {
                    let parent = repo
                        .get_activity(parent_id)?
                        .ok_or(ActivityServiceError::NotFound(parent_id))?;
                    parent.level + 1
                }
                None => 0,
            };
            self.ensure_level_allowed(level)?;

            Ok(repo.insert_activity(&NewActivity {
                name,
                description,
                parent_id,
                level,
            })?)
        })?;
        info!(
            "event=activity_create module=activity status=ok activity_id={} level={}",
            created.id, created.level
        );
        Ok(created)
    }

    /// Loads one activity by id.
    pub fn get_activity(&self, id: ActivityId) -> ActivityServiceResult<Activity> {
        self.repo
            .get_activity(id)?
            .ok_or(ActivityServiceError::NotFound(id))
    }

    /// Lists root activities with optional pagination.
    pub fn list_roots(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> ActivityServiceResult<Vec<Activity>> {
        self.repo.list_roots(limit, offset).map_err(Into::into)
    }

    /// Finds activities whose name contains `fragment`, ignoring case.
    pub fn find_by_name(&self, fragment: &str) -> ActivityServiceResult<Vec<Activity>> {
        self.repo.find_by_name(fragment.trim()).map_err(Into::into)
    }

    /// Applies a partial update, re-parenting and re-leveling when requested.
    ///
    /// A parent equal to the current one is a no-op for the hierarchy.
    pub fn update_activity(
        &self,
        id: ActivityId,
        patch: &ActivityPatch,
    ) -> ActivityServiceResult<Activity> {
        let name = patch
            .name
            .as_deref()
            .map(normalize_activity_name)
            .transpose()
            .map_err(ActivityServiceError::InvalidName)?;

        let (updated, relevelled) =
            self.repo
                .write_scope(|repo| -> ActivityServiceResult<(Activity, usize)> {
                    let forest = ActivityForest::new(repo.list_all()?);
                    let current = forest.get(id).ok_or(ActivityServiceError::NotFound(id))?;

                    let mut updated = current.clone();
                    if let Some(name) = name {
                        updated.name = name;
                    }
                    if let Some(description) = &patch.description {
                        updated.description = description.clone();
                    }

                    let mut batch = Vec::new();
                    if let Some(new_parent_id) = patch.parent_id {
                        if Some(new_parent_id) != current.parent_id {
                            batch = self.plan_move(&forest, &mut updated, new_parent_id)?;
                        }
                    }
                    let relevelled = batch.len();
                    batch.insert(0, updated.clone());

                    repo.save_activities(&batch)?;
                    Ok((updated, relevelled))
                })?;
        info!(
            "event=activity_update module=activity status=ok activity_id={} level={} relevelled={}",
            updated.id, updated.level, relevelled
        );
        Ok(updated)
    }

    /// Deletes an activity and its subtree. Returns `false` if it did not exist.
    pub fn delete_activity(&self, id: ActivityId) -> ActivityServiceResult<bool> {
        let deleted = self.repo.delete_activity(id)?;
        info!(
            "event=activity_delete module=activity status=ok activity_id={} deleted={}",
            id, deleted
        );
        Ok(deleted)
    }

    /// Returns `id` together with every descendant id.
    pub fn descendant_ids(&self, id: ActivityId) -> ActivityServiceResult<HashSet<ActivityId>> {
        let forest = ActivityForest::new(self.repo.list_all()?);
        if forest.get(id).is_none() {
            return Err(ActivityServiceError::NotFound(id));
        }
        let subtree = self.walk_subtree(&forest, id)?;
        Ok(subtree.into_iter().map(|(id, _)| id).collect())
    }

    /// Returns the union of descendant sets for every id in `ids`.
    ///
    /// Unknown ids are skipped.
    pub fn descendant_ids_of_all(
        &self,
        ids: impl IntoIterator<Item = ActivityId>,
    ) -> ActivityServiceResult<HashSet<ActivityId>> {
        let forest = ActivityForest::new(self.repo.list_all()?);
        let mut result = HashSet::new();
        for id in ids {
            if forest.get(id).is_none() || result.contains(&id) {
                continue;
            }
            result.extend(self.walk_subtree(&forest, id)?.into_iter().map(|(id, _)| id));
        }
        Ok(result)
    }

    /// Returns roots, or the children of `parent_id`, with subtrees attached.
    pub fn tree(
        &self,
        parent_id: Option<ActivityId>,
    ) -> ActivityServiceResult<Vec<ActivityNode>> {
        let forest = ActivityForest::new(self.repo.list_all()?);
        let start = match parent_id {
            Some(parent_id) => {
                if forest.get(parent_id).is_none() {
                    return Err(ActivityServiceError::NotFound(parent_id));
                }
                forest.children_of(parent_id)
            }
            None => forest.roots(),
        };

        forest
            .build_nodes(start, self.max_level)
            .map_err(|err| self.invariant_violation(err))
    }

    fn ensure_level_allowed(&self, level: u32) -> ActivityServiceResult<()> {
        if level >= self.max_level {
            return Err(ActivityServiceError::DepthExceeded {
                level,
                max_level: self.max_level,
            });
        }
        Ok(())
    }

    /// Re-parents `node` in place and returns every descendant whose level
    /// changes. Nothing is written here.
    fn plan_move(
        &self,
        forest: &ActivityForest,
        node: &mut Activity,
        new_parent_id: ActivityId,
    ) -> ActivityServiceResult<Vec<Activity>> {
        if new_parent_id == node.id {
            return Err(ActivityServiceError::SelfParent(node.id));
        }
        let parent = forest
            .get(new_parent_id)
            .ok_or(ActivityServiceError::NotFound(new_parent_id))?;

        let subtree = self.walk_subtree(forest, node.id)?;
        if subtree.iter().any(|(id, _)| *id == new_parent_id) {
            return Err(ActivityServiceError::CycleDetected {
                activity_id: node.id,
                parent_id: new_parent_id,
            });
        }

        let new_level = parent.level + 1;
        self.ensure_level_allowed(new_level)?;
        let deepest_generation = subtree
            .iter()
            .map(|(_, generation)| *generation)
            .max()
            .unwrap_or(0);
        self.ensure_level_allowed(new_level + deepest_generation)?;

        node.parent_id = Some(new_parent_id);
        node.level = new_level;

        let mut relevelled = Vec::new();
        for (descendant_id, generation) in subtree.into_iter().skip(1) {
            let Some(descendant) = forest.get(descendant_id) else {
                continue;
            };
            let level = new_level + generation;
            if descendant.level != level {
                let mut descendant = descendant.clone();
                descendant.level = level;
                relevelled.push(descendant);
            }
        }
        Ok(relevelled)
    }

    fn walk_subtree(
        &self,
        forest: &ActivityForest,
        id: ActivityId,
    ) -> ActivityServiceResult<Vec<(ActivityId, u32)>> {
        forest
            .subtree(id, self.max_level)
            .map_err(|err| self.invariant_violation(err))
    }

    fn invariant_violation(&self, err: ForestError) -> ActivityServiceError {
        warn!(
            "event=activity_invariant module=activity status=error max_level={} error={}",
            self.max_level, err
        );
        err.into()
    }
}
