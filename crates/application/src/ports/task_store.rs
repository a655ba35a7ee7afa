//! Task store port
//!
//! Defines the persistence interface for tasks.

use async_trait::async_trait;
use domain::{Task, TaskId, TaskTitle};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for task persistence
///
/// Implementations must report a missing record on `delete` and `complete`
/// as `ApplicationError::NotFound`, distinct from any other failure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskStorePort: Send + Sync {
    /// List all tasks, newest first
    async fn list(&self) -> Result<Vec<Task>, ApplicationError>;

    /// Insert a task and return the stored record
    async fn create(&self, title: &TaskTitle) -> Result<Task, ApplicationError>;

    /// Delete a task by ID
    async fn delete(&self, id: TaskId) -> Result<(), ApplicationError>;

    /// Mark a task completed and return the updated record
    async fn complete(&self, id: TaskId) -> Result<Task, ApplicationError>;
}
