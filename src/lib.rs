//! Task tree service library.
//!
//! Tasks form a forest through `parent_task` references. Completing every
//! child of a task completes it, and uncompleting a task uncompletes its whole
//! ancestry; [`propagation`] implements both walks.

pub mod accounts;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod guards;
pub mod integrity;
pub mod lifecycle;
pub mod propagation;
pub mod server;
pub mod store;
pub mod types;
