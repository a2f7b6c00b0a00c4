//! In-memory task store used as the reference adapter and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::workflow::{
    domain::{ReviewerId, Role, Task, TaskId, TaskStatus},
    ports::{TaskChange, TaskStore, TaskStoreError, TaskStoreResult},
};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Thread-safe in-memory task store.
///
/// Commits are staged and applied under a single write lock, so readers see
/// either none or all of a commit's writes.
#[derive(Debug, Clone)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryTaskState>>,
    injected_faults: Arc<AtomicUsize>,
    changes: broadcast::Sender<TaskChange>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(InMemoryTaskState::default())),
            injected_faults: Arc::new(AtomicUsize::new(0)),
            changes,
        }
    }

    /// Makes the next `count` commits fail with
    /// [`TaskStoreError::Unavailable`] after their first write has been
    /// staged. Staged writes are discarded.
    pub fn fail_next_commits(&self, count: usize) {
        self.injected_faults.store(count, Ordering::SeqCst);
    }

    /// Returns the number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map(|guard| guard.tasks.len()).unwrap_or(0)
    }

    /// Returns `true` if no tasks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_fault(&self) -> bool {
        self.injected_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    fn publish(&self, tasks: Vec<Task>) {
        if self.changes.send(TaskChange { tasks }).is_err() {
            debug!("no task change subscribers");
        }
    }

    fn select<F>(&self, predicate: F) -> TaskStoreResult<Vec<Task>>
    where
        F: Fn(&Task) -> bool,
    {
        let state = self.state.read().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut selected: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| predicate(task))
            .cloned()
            .collect();
        selected.sort_by_key(Task::queue_position);
        Ok(selected)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn put(&self, task: &Task) -> TaskStoreResult<()> {
        {
            let mut state = self.state.write().map_err(|err| {
                TaskStoreError::persistence(std::io::Error::other(err.to_string()))
            })?;
            state.tasks.insert(task.id(), task.clone());
        }
        self.publish(vec![task.clone()]);
        Ok(())
    }

    async fn commit(&self, tasks: &[Task]) -> TaskStoreResult<()> {
        {
            let mut state = self.state.write().map_err(|err| {
                TaskStoreError::persistence(std::io::Error::other(err.to_string()))
            })?;

            let mut staged = HashMap::with_capacity(tasks.len());
            for task in tasks {
                staged.insert(task.id(), task.clone());
                if self.take_fault() {
                    return Err(TaskStoreError::Unavailable(format!(
                        "injected fault after staging task {}",
                        task.id()
                    )));
                }
            }
            state.tasks.extend(staged);
        }
        self.publish(tasks.to_vec());
        Ok(())
    }

    async fn list_by_assignee(&self, reviewer: &ReviewerId) -> TaskStoreResult<Vec<Task>> {
        self.select(|task| task.assigned_to() == reviewer)
    }

    async fn list_by_role(&self, role: Role, status: TaskStatus) -> TaskStoreResult<Vec<Task>> {
        self.select(|task| task.assigned_role() == role && task.status() == status)
    }

    async fn list_by_origin(&self, origin: TaskId) -> TaskStoreResult<Vec<Task>> {
        self.select(|task| task.origin_task_id() == origin)
    }

    fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }
}
