//! Task entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{TaskId, TaskTitle};

/// A stored task
///
/// Created by the store with a generated `id` and `created_at`. The only
/// permitted mutation is marking it completed, which cannot be undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier
    pub id: TaskId,
    /// Task title
    pub title: TaskTitle,
    /// Whether the task has been completed
    pub completed: bool,
    /// When the task was inserted
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Mark the task as completed
    ///
    /// Completing an already-completed task is a no-op.
    pub fn complete(&mut self) {
        self.completed = true;
    }
}
