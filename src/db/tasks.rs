//! Task persistence and tree queries.

use super::{Database, Result, ms_to_datetime};
use crate::types::{Task, TaskId, TaskPatch};
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str = "id, title, description, created_by, created_on, completed, \
                            completed_on, due_date, estimated_completion_time, parent_task";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let created_on: i64 = row.get("created_on")?;
    let completed_on: Option<i64> = row.get("completed_on")?;
    let due_date: Option<i64> = row.get("due_date")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        created_by: row.get("created_by")?,
        created_on: ms_to_datetime(created_on),
        completed: row.get("completed")?,
        completed_on: completed_on.map(ms_to_datetime),
        due_date: due_date.map(ms_to_datetime),
        estimated_completion_time: row.get("estimated_completion_time")?,
        parent_task: row.get("parent_task")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: &TaskId) -> Result<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    let task = conn
        .query_row(&sql, params![task_id], parse_task_row)
        .optional()?;
    Ok(task)
}

/// Write every mutable column of `task` back to its row.
fn write_task_internal(conn: &Connection, task: &Task) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE tasks SET
            title = ?2, description = ?3, completed = ?4, completed_on = ?5,
            due_date = ?6, estimated_completion_time = ?7
         WHERE id = ?1",
        params![
            &task.id,
            &task.title,
            &task.description,
            task.completed,
            task.completed_on.map(|d| d.timestamp_millis()),
            task.due_date.map(|d| d.timestamp_millis()),
            task.estimated_completion_time,
        ],
    )?;
    Ok(changed)
}

fn insert_task_internal(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (
            id, title, description, created_by, created_on, completed,
            completed_on, due_date, estimated_completion_time, parent_task
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &task.id,
            &task.title,
            &task.description,
            &task.created_by,
            task.created_on.timestamp_millis(),
            task.completed,
            task.completed_on.map(|d| d.timestamp_millis()),
            task.due_date.map(|d| d.timestamp_millis()),
            task.estimated_completion_time,
            &task.parent_task,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert a fully-formed task as is, without looking at its parent.
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        self.with_conn(|conn| insert_task_internal(conn, task))
    }

    /// Insert a task only if its parent exists at the moment of insertion.
    ///
    /// Returns false, and inserts nothing, if `task.parent_task` names a
    /// missing task. Root tasks are always inserted.
    pub fn insert_child_task(&self, task: &Task) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(ref parent) = task.parent_task {
                let exists = tx
                    .query_row("SELECT 1 FROM tasks WHERE id = ?1", params![parent], |_| {
                        Ok(())
                    })
                    .optional()?
                    .is_some();
                if !exists {
                    return Ok(false);
                }
            }
            insert_task_internal(&tx, task)?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Point lookup by id.
    pub fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// All tasks whose parent is `parent_id`, in insertion order.
    pub fn find_children(&self, parent_id: &TaskId) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE parent_task = ?1 ORDER BY rowid",
                TASK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params![parent_id], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Set only the completion flag. Returns false if the task does not exist.
    pub fn set_completed(&self, task_id: &TaskId, completed: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET completed = ?2 WHERE id = ?1",
                params![task_id, completed],
            )?;
            Ok(changed > 0)
        })
    }

    /// Apply a patch under one lock and return the stored result.
    ///
    /// Returns `None` if the task does not exist.
    pub fn update_task(&self, task_id: &TaskId, patch: &TaskPatch) -> Result<Option<Task>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(mut task) = get_task_internal(&tx, task_id)? else {
                return Ok(None);
            };
            patch.apply_to(&mut task);
            write_task_internal(&tx, &task)?;

            tx.commit()?;
            Ok(Some(task))
        })
    }

    /// Delete a task, promoting its children to roots.
    ///
    /// Returns the number of detached children, or `None` if the task did not
    /// exist.
    pub fn delete_task(&self, task_id: &TaskId) -> Result<Option<usize>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let detached = tx.execute(
                "UPDATE tasks SET parent_task = NULL WHERE parent_task = ?1",
                params![task_id],
            )?;
            let deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            if deleted == 0 {
                // Nothing to delete; leave any children untouched
                return Ok(None);
            }

            tx.commit()?;
            Ok(Some(detached))
        })
    }

    /// Every task, in insertion order.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tasks ORDER BY rowid", TASK_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Count all tasks.
    pub fn count_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
