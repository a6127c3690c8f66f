//! Store accessor used by the propagation engine.
//!
//! The engine only needs three primitives, so it is written against this
//! trait rather than the concrete database. Tests substitute an in-memory map
//! with failure injection.

use crate::db::{Database, StoreError};
use crate::types::{Task, TaskId};

pub trait TaskStore {
    /// Point lookup by id.
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Tasks whose parent is exactly `parent`. There is no way to
    /// ask for the children of "no parent".
    fn find_children(&self, parent: &TaskId) -> Result<Vec<Task>, StoreError>;

    /// Persist a new completion flag. Returns false if the task is gone.
    fn set_completed(&self, id: &TaskId, completed: bool) -> Result<bool, StoreError>;
}

impl TaskStore for Database {
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Database::get_task(self, id)
    }

    fn find_children(&self, parent: &TaskId) -> Result<Vec<Task>, StoreError> {
        Database::find_children(self, parent)
    }

    fn set_completed(&self, id: &TaskId, completed: bool) -> Result<bool, StoreError> {
        Database::set_completed(self, id, completed)
    }
}

impl<S: TaskStore + ?Sized> TaskStore for &S {
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        (**self).get_task(id)
    }

    fn find_children(&self, parent: &TaskId) -> Result<Vec<Task>, StoreError> {
        (**self).find_children(parent)
    }

    fn set_completed(&self, id: &TaskId, completed: bool) -> Result<bool, StoreError> {
        (**self).set_completed(id, completed)
    }
}
