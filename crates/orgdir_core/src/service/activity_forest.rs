//! In-memory view of the activity hierarchy built from one bulk fetch.
//!
//! # Invariants
//! - Every traversal is capped at `max_generations`; exceeding the cap or
//!   revisiting a node reports a [`ForestError`] instead of looping.
//! - Child order follows storage order of the flat input.

use crate::model::activity::{Activity, ActivityId, ActivityNode};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Display, Formatter};

/// Corruption detected while walking stored parent links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ForestError {
    /// A node was reached twice; the parent chain contains a cycle.
    Cycle(ActivityId),
    /// A node sits deeper than the configured number of generations.
    TooDeep {
        start: ActivityId,
        max_generations: u32,
    },
}

impl Display for ForestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle(id) => write!(f, "activity {id} is reachable twice; parent cycle"),
            Self::TooDeep {
                start,
                max_generations,
            } => write!(
                f,
                "subtree of activity {start} is deeper than {max_generations} generations"
            ),
        }
    }
}

pub(crate) struct ActivityForest {
    by_id: HashMap<ActivityId, Activity>,
    children: HashMap<ActivityId, Vec<ActivityId>>,
    roots: Vec<ActivityId>,
}

impl ActivityForest {
    pub(crate) fn new(activities: Vec<Activity>) -> Self {
        let mut by_id = HashMap::with_capacity(activities.len());
        let mut children: HashMap<ActivityId, Vec<ActivityId>> = HashMap::new();
        let mut roots = Vec::new();

        for activity in activities {
            match activity.parent_id {
                Some(parent_id) => children.entry(parent_id).or_default().push(activity.id),
                None => roots.push(activity.id),
            }
            by_id.insert(activity.id, activity);
        }

        Self {
            by_id,
            children,
            roots,
        }
    }

    pub(crate) fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.by_id.get(&id)
    }

    pub(crate) fn roots(&self) -> &[ActivityId] {
        &self.roots
    }

    pub(crate) fn children_of(&self, id: ActivityId) -> &[ActivityId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks the subtree rooted at `start` breadth-first.
    ///
    /// Returns `(id, generation)` pairs with `start` at generation 0; every
    /// parent precedes its children. Generations must stay below
    /// `max_generations`.
    pub(crate) fn subtree(
        &self,
        start: ActivityId,
        max_generations: u32,
    ) -> Result<Vec<(ActivityId, u32)>, ForestError> {
        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([(start, 0_u32)]);

        while let Some((current, generation)) = queue.pop_front() {
            if generation >= max_generations {
                return Err(ForestError::TooDeep {
                    start,
                    max_generations,
                });
            }
            if !visited.insert(current) {
                return Err(ForestError::Cycle(current));
            }
            ordered.push((current, generation));
            for child in self.children_of(current) {
                queue.push_back((*child, generation + 1));
            }
        }

        Ok(ordered)
    }

    /// Assembles nested nodes for `ids`, each at generation 0.
    pub(crate) fn build_nodes(
        &self,
        ids: &[ActivityId],
        max_generations: u32,
    ) -> Result<Vec<ActivityNode>, ForestError> {
        let mut visited = HashSet::new();
        ids.iter()
            .filter_map(|id| self.by_id.get(id).map(|activity| (*id, activity)))
            .map(|(id, activity)| {
                self.build_node(id, activity, 0, max_generations, &mut visited)
            })
            .collect()
    }

    fn build_node(
        &self,
        id: ActivityId,
        activity: &Activity,
        generation: u32,
        max_generations: u32,
        visited: &mut HashSet<ActivityId>,
    ) -> Result<ActivityNode, ForestError> {
        if generation >= max_generations {
            return Err(ForestError::TooDeep {
                start: id,
                max_generations,
            });
        }
        if !visited.insert(id) {
            return Err(ForestError::Cycle(id));
        }

        let mut children = Vec::new();
        for child_id in self.children_of(id) {
            if let Some(child) = self.by_id.get(child_id) {
                children.push(self.build_node(
                    *child_id,
                    child,
                    generation + 1,
                    max_generations,
                    visited,
                )?);
            }
        }

        Ok(ActivityNode {
            activity: activity.clone(),
            children,
        })
    }
}
