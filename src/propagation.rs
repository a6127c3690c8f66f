//! Ancestor completion propagation.
//!
//! Two upward walks keep the `completed` flag of every task with children
//! equal to "all of my children are completed":
//!
//! - [`uncomplete_ancestors`] forces a task and every ancestor to incomplete.
//!   It runs when a child appears or a task is explicitly uncompleted.
//! - [`recomplete_ancestors`] marks a task complete if all its children are,
//!   then repeats on the parent, stopping at the first incomplete child.
//!
//! Both walks move strictly upward through `parent_task` and never inspect
//! grandchildren. There is no atomicity across the read-children / write-parent
//! step; concurrent walks settle because every completion write is preceded by
//! a fresh children query.

use crate::db::StoreError;
use crate::store::TaskStore;
use crate::types::TaskId;
use std::collections::HashSet;
use tracing::{debug, info};

/// Failure modes of a propagation walk. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    /// The children query found this id as a parent but the task itself is
    /// gone. The tree references a nonexistent document.
    #[error("task {0} not found while completing ancestors")]
    MissingAncestor(TaskId),

    /// The walk reached an id it already visited; `parent_task` links form a cycle.
    #[error("ancestor walk revisited task {0}; parent links form a cycle")]
    CycleDetected(TaskId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a walk did, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Tasks whose completion flag was written. Rows that disappeared between
    /// the lookup and the write are not listed.
    pub updated: Vec<TaskId>,
    /// Task at which a recompletion walk found an incomplete child.
    pub blocked_at: Option<TaskId>,
}

impl PropagationReport {
    pub fn writes(&self) -> usize {
        self.updated.len()
    }
}

/// Force `start` and every ancestor above it to `completed = false`.
///
/// Writes are unconditional. A missing task ends the walk quietly, as does
/// reaching a root.
pub fn uncomplete_ancestors<S: TaskStore>(
    store: &S,
    start: Option<&TaskId>,
) -> Result<PropagationReport, PropagationError> {
    let mut report = PropagationReport::default();
    let mut visited = HashSet::new();
    let mut current = start.cloned();

    while let Some(id) = current {
        if !visited.insert(id.clone()) {
            return Err(PropagationError::CycleDetected(id));
        }

        let Some(task) = store.get_task(&id)? else {
            debug!(task_id = %id, "ancestor missing, uncomplete walk ends");
            break;
        };

        if store.set_completed(&id, false)? {
            debug!(task_id = %id, "ancestor marked incomplete");
            report.updated.push(id);
        } else {
            debug!(task_id = %id, "ancestor vanished before its write");
        }

        current = task.parent_task;
    }

    if let Some(start) = start {
        info!(
            start = %start,
            writes = report.writes(),
            "uncomplete walk finished"
        );
    }
    Ok(report)
}

/// Mark `start` complete if every child is complete, then continue upward.
///
/// Stops at the first task with an incomplete child. A task with no children
/// counts as having all children complete. The walk ends at a root without
/// ever querying "children of nothing".
pub fn recomplete_ancestors<S: TaskStore>(
    store: &S,
    start: Option<&TaskId>,
) -> Result<PropagationReport, PropagationError> {
    let mut report = PropagationReport::default();
    let mut visited = HashSet::new();
    let mut current = start.cloned();

    while let Some(id) = current {
        if !visited.insert(id.clone()) {
            return Err(PropagationError::CycleDetected(id));
        }

        let children = store.find_children(&id)?;
        if let Some(blocker) = children.iter().find(|c| !c.completed) {
            debug!(task_id = %id, blocker = %blocker.id, "incomplete child, recomplete walk stops");
            report.blocked_at = Some(id);
            break;
        }

        let task = store
            .get_task(&id)?
            .ok_or_else(|| PropagationError::MissingAncestor(id.clone()))?;

        if store.set_completed(&id, true)? {
            debug!(task_id = %id, children = children.len(), "ancestor marked complete");
            report.updated.push(id);
        } else {
            debug!(task_id = %id, "ancestor vanished before its write");
        }

        current = task.parent_task;
    }

    if let Some(start) = start {
        info!(
            start = %start,
            writes = report.writes(),
            blocked = report.blocked_at.is_some(),
            "recomplete walk finished"
        );
    }
    Ok(report)
}
