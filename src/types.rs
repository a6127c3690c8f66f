//! Core types for the task tree service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{self, Write as _};

/// Length of a task or user identifier in hex characters.
pub const ID_LEN: usize = 24;

/// Generate a fresh 24-character identifier: 4 bytes of creation seconds
/// followed by 8 random bytes, lowercase hex.
fn generate_hex_id() -> String {
    let secs = Utc::now().timestamp() as u32;
    let tail: [u8; 8] = rand::random();

    let mut out = String::with_capacity(ID_LEN);
    for b in secs.to_be_bytes().iter().chain(tail.iter()) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn is_hex_id(raw: &str) -> bool {
    raw.len() == ID_LEN && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generate a new unique identifier.
            pub fn generate() -> Self {
                Self(generate_hex_id())
            }

            /// Parse a 24-character lowercase hex identifier.
            pub fn parse(raw: &str) -> Option<Self> {
                is_hex_id(raw).then(|| Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                if is_hex_id(&raw) {
                    Ok(Self(raw))
                } else {
                    Err(format!(
                        "invalid {} id '{}': expected {} lowercase hex characters",
                        $label, raw, ID_LEN
                    ))
                }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hex_id!(
    /// Identifier of a task.
    TaskId,
    "task"
);

hex_id!(
    /// Identifier of a registered user.
    UserId,
    "user"
);

/// A task in the tree.
///
/// Children are not stored on the task; they are every task whose
/// `parent_task` points here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub created_by: UserId,
    pub created_on: DateTime<Utc>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<f64>,
    pub parent_task: Option<TaskId>,
}

/// A task with its descendants embedded, for display.
#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    /// Total number of tasks in this subtree, including the root.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(TaskNode::subtree_size).sum::<usize>()
    }
}

/// Body of a create request.
///
/// Server-owned fields (`id`, `createdBy`, `createdOn`, `completed`) are not
/// part of this type, so any client-supplied values are dropped on parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_task: Option<TaskId>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_completion_time: Option<f64>,
}

/// Body of an edit request.
///
/// Optional metadata uses `Option<Option<_>>`: absent leaves the value alone,
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub completed_on: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub estimated_completion_time: Option<Option<f64>>,
}

impl TaskPatch {
    /// Apply the patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(completed_on) = self.completed_on {
            task.completed_on = completed_on;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(estimate) = self.estimated_completion_time {
            task.estimated_completion_time = estimate;
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A registered user. The password digest never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_on: DateTime<Utc>,
}

/// Email and password pair used for registration and login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
