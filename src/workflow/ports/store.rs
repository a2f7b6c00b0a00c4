//! Store port for task persistence, queue listing, and change feeds.

use crate::workflow::domain::{ReviewerId, Role, Task, TaskId, TaskStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Records applied by one write or commit, published after they are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    /// Tasks in the order they were written.
    pub tasks: Vec<Task>,
}

/// Task persistence contract.
///
/// Listing operations return tasks in ascending queue position and reflect
/// only committed writes.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Inserts or replaces a single task.
    async fn put(&self, task: &Task) -> TaskStoreResult<()>;

    /// Inserts or replaces several tasks as one unit.
    ///
    /// # Errors
    ///
    /// On error none of the writes is visible to later reads.
    async fn commit(&self, tasks: &[Task]) -> TaskStoreResult<()>;

    /// Returns all tasks assigned to `reviewer`, oldest first.
    async fn list_by_assignee(&self, reviewer: &ReviewerId) -> TaskStoreResult<Vec<Task>>;

    /// Returns all tasks for `role` with `status`, oldest first.
    async fn list_by_role(&self, role: Role, status: TaskStatus) -> TaskStoreResult<Vec<Task>>;

    /// Returns every task of the pipeline instance rooted at `origin`,
    /// oldest first.
    async fn list_by_origin(&self, origin: TaskId) -> TaskStoreResult<Vec<Task>>;

    /// Subscribes to committed changes.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<TaskChange>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// Transient failure; the operation may succeed if retried.
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns `true` when retrying the operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
