//! Offline consistency check of the whole task forest.

use crate::db::{Database, StoreError};
use crate::types::{Task, TaskId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A problem found in the stored tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeIssue {
    /// A task with children whose flag disagrees with "all children completed".
    CompletionMismatch {
        task: TaskId,
        completed: bool,
        children: usize,
        incomplete_children: usize,
    },
    /// A task whose parent does not exist.
    DanglingParent { task: TaskId, parent: TaskId },
}

impl fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeIssue::CompletionMismatch {
                task,
                completed,
                children,
                incomplete_children,
            } => write!(
                f,
                "{}: completed={} but {} of {} children incomplete",
                task, completed, incomplete_children, children
            ),
            TreeIssue::DanglingParent { task, parent } => {
                write!(f, "{}: parent {} does not exist", task, parent)
            }
        }
    }
}

/// Summary of a check run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub tasks: usize,
    pub issues: Vec<TreeIssue>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check a list of tasks against the completion invariant.
pub fn check_tasks(tasks: &[Task]) -> CheckReport {
    let ids: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
    let mut children: HashMap<&TaskId, Vec<&Task>> = HashMap::new();
    let mut issues = Vec::new();

    for task in tasks {
        if let Some(ref parent) = task.parent_task {
            if ids.contains(parent) {
                children.entry(parent).or_default().push(task);
            } else {
                issues.push(TreeIssue::DanglingParent {
                    task: task.id.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }

    for task in tasks {
        let Some(kids) = children.get(&task.id) else {
            continue;
        };
        let incomplete = kids.iter().filter(|c| !c.completed).count();
        if task.completed != (incomplete == 0) {
            issues.push(TreeIssue::CompletionMismatch {
                task: task.id.clone(),
                completed: task.completed,
                children: kids.len(),
                incomplete_children: incomplete,
            });
        }
    }

    CheckReport {
        tasks: tasks.len(),
        issues,
    }
}

/// Load every task from `db` and check it.
pub fn check_database(db: &Database) -> Result<CheckReport, StoreError> {
    let tasks = db.list_tasks()?;
    Ok(check_tasks(&tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::Utc;

    fn task(parent: Option<&TaskId>, completed: bool) -> Task {
        Task {
            id: TaskId::generate(),
            title: "t".into(),
            description: "d".into(),
            created_by: UserId::generate(),
            created_on: Utc::now(),
            completed,
            completed_on: None,
            due_date: None,
            estimated_completion_time: None,
            parent_task: parent.cloned(),
        }
    }

    #[test]
    fn consistent_tree_is_clean() {
        let root = task(None, true);
        let a = task(Some(&root.id), true);
        let b = task(Some(&root.id), true);
        let leaf = task(None, false);

        let report = check_tasks(&[root, a, b, leaf]);
        assert!(report.is_clean());
        assert_eq!(report.tasks, 4);
    }

    #[test]
    fn leaf_completion_is_never_an_issue() {
        let report = check_tasks(&[task(None, true), task(None, false)]);
        assert!(report.is_clean());
    }

    #[test]
    fn detects_mismatch_both_ways() {
        let stale_true = task(None, true);
        let open_child = task(Some(&stale_true.id), false);
        let stale_false = task(None, false);
        let done_child = task(Some(&stale_false.id), true);

        let report = check_tasks(&[stale_true.clone(), open_child, stale_false.clone(), done_child]);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues.iter().all(|i| matches!(i, TreeIssue::CompletionMismatch { .. })));
    }

    #[test]
    fn detects_dangling_parent() {
        let ghost = TaskId::generate();
        let orphan = task(Some(&ghost), false);

        let report = check_tasks(std::slice::from_ref(&orphan));
        assert_eq!(
            report.issues,
            vec![TreeIssue::DanglingParent {
                task: orphan.id,
                parent: ghost
            }]
        );
    }
}
