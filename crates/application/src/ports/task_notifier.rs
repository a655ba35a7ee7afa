//! Task notifier port
//!
//! Outbound notification sent after a task is created.

use async_trait::async_trait;
use domain::Task;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for notifying an external system about new tasks
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskNotifierPort: Send + Sync {
    /// Announce a newly created task
    async fn task_created(&self, task: &Task) -> Result<(), ApplicationError>;
}
