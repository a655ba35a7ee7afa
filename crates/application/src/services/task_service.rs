//! Task service
//!
//! Orchestrates the task store and the outbound creation notification.

use std::{fmt, sync::Arc};

use domain::{Task, TaskId, TaskTitle};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{TaskNotifierPort, TaskStorePort},
};

/// Task service for handling task use cases
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStorePort>,
    notifier: Option<Arc<dyn TaskNotifierPort>>,
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskService {
    /// Create a new task service without outbound notification
    pub fn new(store: Arc<dyn TaskStorePort>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    /// Attach a notifier that is told about every created task
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn TaskNotifierPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// List all tasks, newest first
    #[instrument(level = "debug", skip(self))]
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApplicationError> {
        let tasks = self.store.list().await?;
        debug!(count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    /// Create a task and fire the creation notification
    ///
    /// The notification runs detached from the caller: its outcome never
    /// affects the returned task.
    #[instrument(level = "debug", skip(self), fields(task.title = %title))]
    pub async fn create_task(&self, title: TaskTitle) -> Result<Task, ApplicationError> {
        let task = self.store.create(&title).await?;
        info!(task.id = %task.id, "Task stored");
        self.notify_created(&task);
        Ok(task)
    }

    /// Delete a task by ID
    #[instrument(level = "debug", skip(self), fields(task.id = %id))]
    pub async fn delete_task(&self, id: TaskId) -> Result<(), ApplicationError> {
        self.store.delete(id).await
    }

    /// Mark a task completed
    #[instrument(level = "debug", skip(self), fields(task.id = %id))]
    pub async fn complete_task(&self, id: TaskId) -> Result<Task, ApplicationError> {
        self.store.complete(id).await
    }

    /// Spawn the outbound notification for a created task
    ///
    /// Returns `None` when no notifier is configured. The spawned future
    /// carries the current span so the outbound call joins the request trace.
    pub fn notify_created(&self, task: &Task) -> Option<JoinHandle<()>> {
        let notifier = Arc::clone(self.notifier.as_ref()?);
        let task = task.clone();

        let handle = tokio::spawn(
            async move {
                if let Err(e) = notifier.task_created(&task).await {
                    warn!(error = %e, task.id = %task.id, "Task notification failed");
                }
            }
            .in_current_span(),
        );
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::ports::{MockTaskNotifierPort, MockTaskStorePort};

    fn task(id: i64, title: &str) -> Task {
        Task {
            id: TaskId::new(id),
            title: TaskTitle::new(title).unwrap(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn list_delegates_to_store() {
        let mut store = MockTaskStorePort::new();
        store
            .expect_list()
            .times(1)
            .returning(|| Ok(vec![task(2, "b"), task(1, "a")]));

        let service = TaskService::new(Arc::new(store));
        let tasks = service.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, TaskId::new(2));
    }

    #[tokio::test]
    async fn create_returns_stored_task() {
        let mut store = MockTaskStorePort::new();
        store
            .expect_create()
            .withf(|title| title.as_str() == "Buy milk")
            .times(1)
            .returning(|title| Ok(task(1, title.as_str())));

        let service = TaskService::new(Arc::new(store));
        let created = service
            .create_task(TaskTitle::new("Buy milk").unwrap())
            .await
            .unwrap();
        assert_eq!(created.id, TaskId::new(1));
        assert!(!created.completed);
    }

    #[tokio::test]
    async fn create_notifies_in_background() {
        let mut store = MockTaskStorePort::new();
        store
            .expect_create()
            .returning(|title| Ok(task(5, title.as_str())));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = MockTaskNotifierPort::new();
        notifier.expect_task_created().times(1).returning(move |t| {
            let _ = tx.send(t.id);
            Ok(())
        });

        let service = TaskService::new(Arc::new(store)).with_notifier(Arc::new(notifier));
        service
            .create_task(TaskTitle::new("Notify me").unwrap())
            .await
            .unwrap();

        let notified = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(notified, Some(TaskId::new(5)));
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_create() {
        let mut store = MockTaskStorePort::new();
        store
            .expect_create()
            .returning(|title| Ok(task(9, title.as_str())));

        let mut notifier = MockTaskNotifierPort::new();
        notifier
            .expect_task_created()
            .returning(|_| Err(ApplicationError::ExternalService("timeout".into())));

        let service = TaskService::new(Arc::new(store)).with_notifier(Arc::new(notifier));
        let created = service
            .create_task(TaskTitle::new("Still works").unwrap())
            .await
            .unwrap();
        assert_eq!(created.id, TaskId::new(9));
    }

    #[tokio::test]
    async fn notify_without_notifier_is_none() {
        let store = MockTaskStorePort::new();
        let service = TaskService::new(Arc::new(store));
        assert!(service.notify_created(&task(1, "x")).is_none());
    }

    #[tokio::test]
    async fn notify_handle_completes_after_failure() {
        let store = MockTaskStorePort::new();
        let mut notifier = MockTaskNotifierPort::new();
        notifier
            .expect_task_created()
            .times(1)
            .returning(|_| Err(ApplicationError::ExternalService("refused".into())));

        let service = TaskService::new(Arc::new(store)).with_notifier(Arc::new(notifier));
        let handle = service.notify_created(&task(3, "x")).unwrap();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn delete_propagates_not_found() {
        let mut store = MockTaskStorePort::new();
        store
            .expect_delete()
            .returning(|id| Err(ApplicationError::NotFound(format!("Task {id}"))));

        let service = TaskService::new(Arc::new(store));
        let err = service.delete_task(TaskId::new(404)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn complete_returns_updated_task() {
        let mut store = MockTaskStorePort::new();
        store.expect_complete().returning(|id| {
            let mut t = task(id.as_i64(), "done");
            t.complete();
            Ok(t)
        });

        let service = TaskService::new(Arc::new(store));
        let done = service.complete_task(TaskId::new(4)).await.unwrap();
        assert!(done.completed);
    }

    #[test]
    fn debug_hides_ports() {
        let service = TaskService::new(Arc::new(MockTaskStorePort::new()));
        let debug = format!("{service:?}");
        assert!(debug.contains("TaskService"));
        assert!(debug.contains("notifier: false"));
    }
}
