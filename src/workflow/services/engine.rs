//! Workflow engine: applies review events to tasks and commits the results.
//!
//! Every mutating operation runs its read-modify-write under one
//! [`tokio::sync::Mutex`] that also guards the [`WorkflowSequence`], so two
//! transitions can never interleave their sequence draws or writes. The
//! sequence is advanced on a copy and stored back only after the store has
//! committed, which keeps positions gap-free when a commit fails.
//! Notifications are published after the commit and before the lock is
//! released, so subscribers observe them in commit order.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use mockable::Clock;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use crate::workflow::{
    config::{RetryPolicy, WorkflowConfig},
    domain::{
        AssigneeRule, AssignmentError, AttachedFile, NewRootTask, PendingTransition,
        ReviewerId, ReviewerRoster, Role, SlaPolicy, Stage, Task, TaskId, TaskStatus,
        TransitionPlan, WorkflowDomainError, WorkflowEvent, WorkflowSequence, begin_transition,
    },
    ports::{TaskStore, TaskStoreError},
};

const NOTIFICATION_CAPACITY: usize = 256;

/// Request payload for starting a new pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRootTaskRequest {
    title: String,
    description: String,
    editor: Option<ReviewerId>,
    attached_files: Vec<AttachedFile>,
}

impl CreateRootTaskRequest {
    /// Creates a request with the required title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            editor: None,
            attached_files: Vec::new(),
        }
    }

    /// Sets the brief for the editor.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Assigns the task to a specific editor instead of the rotation.
    #[must_use]
    pub fn with_editor(mut self, editor: ReviewerId) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Sets source material handed to the editor.
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = AttachedFile>) -> Self {
        self.attached_files = files.into_iter().collect();
        self
    }
}

/// Event published to engine subscribers after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowNotification {
    /// Tasks written by one operation, source first.
    TasksCommitted {
        /// Committed task records.
        tasks: Vec<Task>,
    },
    /// A pipeline instance reached the terminal stage.
    WorkflowCompleted {
        /// Root task of the finished instance.
        origin_task_id: TaskId,
        /// Scheduling task that closed the instance.
        completed_task_id: TaskId,
    },
}

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowEngineError {
    /// Domain validation or transition guard failed.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),

    /// Reviewer assignment failed.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The rejected work has no editing ancestor to return to.
    #[error("no editing ancestor found for task {0}")]
    OriginalEditorNotFound(TaskId),

    /// Transient store failures outlasted the retry budget.
    #[error("task store unavailable after {attempts} attempt(s): {source}")]
    StoreUnavailable {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last store failure.
        #[source]
        source: TaskStoreError,
    },

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl WorkflowEngineError {
    /// Returns `true` when the whole operation may be retried.
    ///
    /// Only transient store failures qualify; business-rule errors never do.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }

    fn exhausted(self, attempts: u32) -> Self {
        match self {
            Self::Store(source) => Self::StoreUnavailable { attempts, source },
            other => other,
        }
    }
}

/// Result type for workflow engine operations.
pub type WorkflowEngineResult<T> = Result<T, WorkflowEngineError>;

/// Review pipeline orchestration service.
///
/// Clones share the store, the sequence lock, and the notification channel.
pub struct WorkflowEngine<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    roster: ReviewerRoster,
    sla: SlaPolicy,
    retry: RetryPolicy,
    sequence: Arc<Mutex<WorkflowSequence>>,
    notifications: broadcast::Sender<WorkflowNotification>,
}

impl<S, C> Clone for WorkflowEngine<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            roster: self.roster.clone(),
            sla: self.sla,
            retry: self.retry,
            sequence: Arc::clone(&self.sequence),
            notifications: self.notifications.clone(),
        }
    }
}

impl<S, C> WorkflowEngine<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates an engine whose sequence starts at queue position 1.
    ///
    /// The configuration is used as given; call
    /// [`WorkflowConfig::validate`] beforehand to reject empty rosters at
    /// start-up rather than per operation.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: WorkflowConfig) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            store,
            clock,
            roster: config.roster,
            sla: config.sla,
            retry: config.retry,
            sequence: Arc::new(Mutex::new(WorkflowSequence::default())),
            notifications,
        }
    }

    /// Replaces the starting sequence, e.g. to resume after a restart or to
    /// replay a known ordering.
    #[must_use]
    pub fn with_sequence(mut self, sequence: WorkflowSequence) -> Self {
        self.sequence = Arc::new(Mutex::new(sequence));
        self
    }

    /// Subscribes to committed workflow changes.
    ///
    /// Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowNotification> {
        self.notifications.subscribe()
    }

    /// Returns a snapshot of the shared sequence.
    pub async fn sequence(&self) -> WorkflowSequence {
        *self.sequence.lock().await
    }

    /// Creates the root editing task of a new pipeline instance.
    ///
    /// The editor is taken from the request or, when absent, drawn from the
    /// editor rotation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError`] when the title is empty, no editor is
    /// available, or the store rejects the write.
    pub async fn create_root_task(
        &self,
        request: CreateRootTaskRequest,
    ) -> WorkflowEngineResult<Task> {
        self.retrying("create_root_task", || self.try_create_root(request.clone()))
            .await
    }

    /// Hands the editor's files to quality control.
    ///
    /// Returns the new QC task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError`] when the task is missing, not in the
    /// editing stage, has no files, no QC reviewer is configured, or the
    /// store fails.
    pub async fn submit_for_review(
        &self,
        task_id: TaskId,
        files: Vec<AttachedFile>,
    ) -> WorkflowEngineResult<Task> {
        let plan = self
            .run_transition(task_id, WorkflowEvent::SubmitForReview { files })
            .await?;
        Self::successor_of(plan)
    }

    /// Approves a QC task and forwards the work to scheduling.
    ///
    /// Returns the new scheduling task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError`] when the task is missing, not an
    /// undecided QC task, no scheduler is configured, or the store fails.
    pub async fn approve(
        &self,
        qc_task_id: TaskId,
        feedback: Option<String>,
    ) -> WorkflowEngineResult<Task> {
        let plan = self
            .run_transition(qc_task_id, WorkflowEvent::Approve { feedback })
            .await?;
        Self::successor_of(plan)
    }

    /// Rejects a QC task and returns the work to the editor who produced it.
    ///
    /// Returns the new editing task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::MissingFeedback`] for an empty reason,
    /// and otherwise [`WorkflowEngineError`] when the task is missing, not an
    /// undecided QC task, its editor cannot be traced, or the store fails.
    pub async fn reject(
        &self,
        qc_task_id: TaskId,
        reason: impl Into<String>,
    ) -> WorkflowEngineResult<Task> {
        let plan = self
            .run_transition(
                qc_task_id,
                WorkflowEvent::Reject {
                    reason: reason.into(),
                },
            )
            .await?;
        Self::successor_of(plan)
    }

    /// Confirms a scheduling task, completing the pipeline instance.
    ///
    /// Subscribers receive [`WorkflowNotification::WorkflowCompleted`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError`] when the task is missing, not an
    /// open scheduling task, or the store fails.
    pub async fn confirm_scheduled(&self, scheduling_task_id: TaskId) -> WorkflowEngineResult<()> {
        self.run_transition(scheduling_task_id, WorkflowEvent::ConfirmScheduled)
            .await?;
        Ok(())
    }

    /// Marks a pending task as picked up by its assignee.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError`] when the task is missing, not pending,
    /// completed, or the store fails.
    pub async fn start_task(&self, task_id: TaskId) -> WorkflowEngineResult<Task> {
        self.retrying("start_task", || self.try_start(task_id)).await
    }

    /// Retrieves a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::TaskNotFound`] when the task does not
    /// exist, or [`WorkflowEngineError::Store`] when the lookup fails.
    pub async fn get_task(&self, task_id: TaskId) -> WorkflowEngineResult<Task> {
        self.load(task_id).await
    }

    /// Returns the reviewer's tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::Store`] when the lookup fails.
    pub async fn queue_for_assignee(
        &self,
        reviewer: &ReviewerId,
    ) -> WorkflowEngineResult<Vec<Task>> {
        Ok(self.store.list_by_assignee(reviewer).await?)
    }

    /// Returns the role's tasks with `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::Store`] when the lookup fails.
    pub async fn queue_for_role(
        &self,
        role: Role,
        status: TaskStatus,
    ) -> WorkflowEngineResult<Vec<Task>> {
        Ok(self.store.list_by_role(role, status).await?)
    }

    /// Returns every task of the pipeline instance rooted at `origin`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowEngineError::Store`] when the lookup fails.
    pub async fn workflow_chain(&self, origin: TaskId) -> WorkflowEngineResult<Vec<Task>> {
        Ok(self.store.list_by_origin(origin).await?)
    }

    async fn run_transition(
        &self,
        task_id: TaskId,
        event: WorkflowEvent,
    ) -> WorkflowEngineResult<TransitionPlan> {
        let operation = event.kind().as_str();
        self.retrying(operation, || self.try_transition(task_id, event.clone()))
            .await
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent. The sequence lock is not held between attempts.
    async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> WorkflowEngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowEngineResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts: u32 = 1;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() => {
                    if attempts >= max_attempts {
                        error!(operation, attempts, error = %err, "task store unavailable, giving up");
                        return Err(err.exhausted(attempts));
                    }
                    warn!(operation, attempts, error = %err, "task store unavailable, retrying");
                    attempts = attempts.saturating_add(1);
                    tokio::time::sleep(self.retry.backoff()).await;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_transition(
        &self,
        task_id: TaskId,
        event: WorkflowEvent,
    ) -> WorkflowEngineResult<TransitionPlan> {
        let mut sequence_guard = self.sequence.lock().await;
        let source = self.load(task_id).await?;
        let kind = event.kind();
        let pending = begin_transition(&source, event).inspect_err(|err| {
            debug!(task_id = %task_id, event = %kind, error = %err, "transition refused");
        })?;

        let mut sequence = *sequence_guard;
        let now = self.clock.utc();
        let plan = match pending {
            PendingTransition::Spawn(spawn) => {
                let assignee = match spawn.assignee_rule() {
                    AssigneeRule::RoundRobin(role) => self.draw_reviewer(&mut sequence, role)?,
                    AssigneeRule::OriginalEditor => self.original_editor(spawn.source()).await?,
                };
                let position = sequence.next_position();
                spawn.finish(assignee, position, now, &self.sla)
            }
            PendingTransition::Close(close) => close.finish(now),
        };

        self.store.commit(&plan.writes()).await?;
        *sequence_guard = sequence;

        match plan.successor.as_ref() {
            Some(successor) => info!(
                task_id = %task_id,
                event = %kind,
                successor_id = %successor.id(),
                assignee = %successor.assigned_to(),
                queue_position = %successor.queue_position(),
                "workflow transition committed"
            ),
            None => info!(task_id = %task_id, event = %kind, "workflow transition committed"),
        }
        self.notify_committed(plan.writes());
        if let Some(origin_task_id) = plan.completed_origin() {
            info!(origin_task_id = %origin_task_id, "workflow completed");
            self.notify(WorkflowNotification::WorkflowCompleted {
                origin_task_id,
                completed_task_id: plan.source.id(),
            });
        }
        drop(sequence_guard);
        Ok(plan)
    }

    async fn try_create_root(
        &self,
        request: CreateRootTaskRequest,
    ) -> WorkflowEngineResult<Task> {
        let mut sequence_guard = self.sequence.lock().await;
        let mut sequence = *sequence_guard;

        let CreateRootTaskRequest {
            title,
            description,
            editor,
            attached_files,
        } = request;
        let assignee = match editor {
            Some(chosen) => chosen,
            None => self.draw_reviewer(&mut sequence, Role::Editor)?,
        };
        let task = Task::new_root(
            NewRootTask {
                title,
                description,
                editor: assignee,
                attached_files,
            },
            sequence.next_position(),
            &self.sla,
            &*self.clock,
        )?;

        self.store.commit(std::slice::from_ref(&task)).await?;
        *sequence_guard = sequence;
        info!(
            task_id = %task.id(),
            assignee = %task.assigned_to(),
            queue_position = %task.queue_position(),
            "root task created"
        );
        self.notify_committed(vec![task.clone()]);
        drop(sequence_guard);
        Ok(task)
    }

    async fn try_start(&self, task_id: TaskId) -> WorkflowEngineResult<Task> {
        let sequence_guard = self.sequence.lock().await;
        let mut task = self.load(task_id).await?;
        task.start(&*self.clock).inspect_err(|err| {
            debug!(task_id = %task_id, error = %err, "start refused");
        })?;
        self.store.put(&task).await?;
        info!(task_id = %task_id, stage = %task.stage(), "task started");
        self.notify_committed(vec![task.clone()]);
        drop(sequence_guard);
        Ok(task)
    }

    async fn load(&self, task_id: TaskId) -> WorkflowEngineResult<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or(WorkflowEngineError::TaskNotFound(task_id))
    }

    fn draw_reviewer(
        &self,
        sequence: &mut WorkflowSequence,
        role: Role,
    ) -> WorkflowEngineResult<ReviewerId> {
        sequence.draw_reviewer(&self.roster, role).map_err(|err| {
            error!(role = %role, "reviewer roster is empty");
            WorkflowEngineError::from(err)
        })
    }

    /// Walks the parent chain from `task` to the nearest editing ancestor
    /// and returns its assignee.
    async fn original_editor(&self, task: &Task) -> WorkflowEngineResult<ReviewerId> {
        let mut visited = HashSet::from([task.id()]);
        let mut cursor = task.parent_task_id();
        while let Some(parent_id) = cursor {
            if !visited.insert(parent_id) {
                break;
            }
            let Some(parent) = self.store.get(parent_id).await? else {
                break;
            };
            if parent.stage() == Stage::Editing {
                return Ok(parent.assigned_to().clone());
            }
            cursor = parent.parent_task_id();
        }
        Err(WorkflowEngineError::OriginalEditorNotFound(task.id()))
    }

    fn successor_of(plan: TransitionPlan) -> WorkflowEngineResult<Task> {
        let source_id = plan.source.id();
        plan.successor.ok_or(WorkflowEngineError::Domain(
            WorkflowDomainError::InvalidTransition {
                task_id: source_id,
                stage: plan.source.stage(),
                event: plan.event,
            },
        ))
    }

    fn notify_committed(&self, tasks: Vec<Task>) {
        self.notify(WorkflowNotification::TasksCommitted { tasks });
    }

    fn notify(&self, notification: WorkflowNotification) {
        if self.notifications.send(notification).is_err() {
            debug!("no workflow subscribers");
        }
    }
}
