//! Task lifecycle operations.
//!
//! Each operation performs one store mutation and then hands the affected
//! parent id to the propagation engine in the right direction. Permission and
//! existence checks happen earlier, in [`crate::guards`].

use crate::db::{Database, ms_to_datetime, now_ms};
use crate::error::{ApiError, ApiResult};
use crate::propagation::{recomplete_ancestors, uncomplete_ancestors};
use crate::types::{NewTask, Task, TaskId, TaskNode, TaskPatch, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Task operations shared by every request.
#[derive(Clone)]
pub struct TaskService {
    db: Arc<Database>,
}

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::missing_field(field));
    }
    Ok(())
}

impl TaskService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Create a task owned by `owner`. New tasks always start incomplete, so
    /// every ancestor of a new child becomes incomplete too.
    pub fn create(&self, owner: &UserId, input: NewTask) -> ApiResult<Task> {
        require_text("title", &input.title)?;
        require_text("description", &input.description)?;

        let task = Task {
            id: TaskId::generate(),
            title: input.title,
            description: input.description,
            created_by: owner.clone(),
            created_on: ms_to_datetime(now_ms()),
            completed: false,
            completed_on: None,
            due_date: input.due_date,
            estimated_completion_time: input.estimated_completion_time,
            parent_task: input.parent_task,
        };
        // Parent check and insert share one transaction
        if !self.db.insert_child_task(&task)? {
            let parent = task.parent_task.as_ref().map(ToString::to_string);
            return Err(ApiError::invalid_value(
                "parentTask",
                format!("Parent task {} does not exist", parent.unwrap_or_default()),
            ));
        }

        if let Some(ref parent) = task.parent_task {
            uncomplete_ancestors(&*self.db, Some(parent))?;
        }

        info!(task_id = %task.id, parent = ?task.parent_task, owner = %owner, "task created");
        Ok(task)
    }

    /// Materialize `task` with all of its descendants embedded.
    ///
    /// Descendants are collected with an explicit stack, so tree depth is
    /// bounded by memory rather than by the call stack.
    pub fn show(&self, task: Task) -> ApiResult<TaskNode> {
        // Each descendant with the arena indices of its children. A child is
        // always stored after its parent.
        let mut arena: Vec<(Task, Vec<usize>)> = Vec::new();
        let mut root_children = Vec::new();
        let mut visited = HashSet::from([task.id.clone()]);
        let mut pending: Vec<(Option<usize>, TaskId)> = vec![(None, task.id.clone())];

        while let Some((slot, parent_id)) = pending.pop() {
            for child in self.db.find_children(&parent_id)? {
                if !visited.insert(child.id.clone()) {
                    warn!(task_id = %parent_id, child = %child.id, "parent links form a cycle, child skipped");
                    continue;
                }
                let index = arena.len();
                pending.push((Some(index), child.id.clone()));
                arena.push((child, Vec::new()));
                match slot {
                    Some(parent) => arena[parent].1.push(index),
                    None => root_children.push(index),
                }
            }
        }

        // Assemble from the deepest entries up
        let mut built: HashMap<usize, TaskNode> = HashMap::new();
        while let Some((child, kids)) = arena.pop() {
            let children = kids.iter().filter_map(|k| built.remove(k)).collect();
            built.insert(arena.len(), TaskNode { task: child, children });
        }
        let children = root_children
            .iter()
            .filter_map(|k| built.remove(k))
            .collect();

        Ok(TaskNode { task, children })
    }

    /// Apply a patch to `task` and propagate any explicit completion change.
    ///
    /// A patch that omits `completed` never touches ancestors.
    pub fn edit(&self, task: &Task, patch: TaskPatch) -> ApiResult<Task> {
        if let Some(ref title) = patch.title {
            require_text("title", title)?;
        }
        if let Some(ref description) = patch.description {
            require_text("description", description)?;
        }

        let updated = self
            .db
            .update_task(&task.id, &patch)?
            .ok_or_else(ApiError::task_unavailable)?;

        // The edited task's own flag is authoritative; propagation starts at its parent
        match (patch.completed, updated.parent_task.as_ref()) {
            (Some(false), Some(parent)) => {
                uncomplete_ancestors(&*self.db, Some(parent))?;
            }
            (Some(true), Some(parent)) => {
                recomplete_ancestors(&*self.db, Some(parent))?;
            }
            _ => {}
        }

        info!(task_id = %updated.id, completed = ?patch.completed, "task edited");
        Ok(updated)
    }

    /// Delete `task`. Its children become roots, and its former parent is
    /// re-evaluated since one of its children is gone.
    pub fn delete(&self, task: &Task) -> ApiResult<()> {
        let detached = self
            .db
            .delete_task(&task.id)?
            .ok_or_else(ApiError::task_unavailable)?;

        if detached > 0 {
            info!(task_id = %task.id, detached, "children promoted to roots");
        }

        if let Some(ref parent) = task.parent_task {
            recomplete_ancestors(&*self.db, Some(parent))?;
        }

        info!(task_id = %task.id, "task deleted");
        Ok(())
    }
}
