//! Task aggregate root for the review pipeline.

use super::{
    AttachedFile, QueuePosition, ReviewerId, Role, SlaPolicy, Stage, TaskId, TaskStatus,
    WorkflowDomainError, WorkflowEventKind,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Unit of work moving through the review pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    stage: Stage,
    status: TaskStatus,
    assigned_to: ReviewerId,
    assigned_role: Role,
    queue_position: QueuePosition,
    created_at: DateTime<Utc>,
    due_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    parent_task_id: Option<TaskId>,
    origin_task_id: TaskId,
    attached_files: Vec<AttachedFile>,
    feedback: Option<String>,
    rejection_reason: Option<String>,
}

/// Request data for a root task entering the pipeline at the editing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRootTask {
    /// Task title; must not be empty.
    pub title: String,
    /// Free-text brief for the editor.
    pub description: String,
    /// Editor who owns the work.
    pub editor: ReviewerId,
    /// Source material handed to the editor.
    pub attached_files: Vec<AttachedFile>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted pipeline stage.
    pub stage: Stage,
    /// Persisted in-stage status.
    pub status: TaskStatus,
    /// Persisted assignee.
    pub assigned_to: ReviewerId,
    /// Persisted assignee role.
    pub assigned_role: Role,
    /// Persisted queue position.
    pub queue_position: QueuePosition,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted due date.
    pub due_date: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted parent task, if any.
    pub parent_task_id: Option<TaskId>,
    /// Persisted pipeline root.
    pub origin_task_id: TaskId,
    /// Persisted file references.
    pub attached_files: Vec<AttachedFile>,
    /// Persisted approval feedback.
    pub feedback: Option<String>,
    /// Persisted rejection reason.
    pub rejection_reason: Option<String>,
}

/// Values that differ between a task and the successor it spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SuccessorSpec {
    pub stage: Stage,
    pub assignee: ReviewerId,
    pub queue_position: QueuePosition,
    pub attached_files: Vec<AttachedFile>,
    pub feedback: Option<String>,
    pub rejection_reason: Option<String>,
    pub now: DateTime<Utc>,
}

impl Task {
    /// Creates a root task in the editing stage.
    ///
    /// The root task is its own origin.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTitle`] if the title is empty
    /// after trimming.
    pub fn new_root(
        request: NewRootTask,
        queue_position: QueuePosition,
        sla: &SlaPolicy,
        clock: &impl Clock,
    ) -> Result<Self, WorkflowDomainError> {
        let NewRootTask {
            title,
            description,
            editor,
            attached_files,
        } = request;
        let normalized_title = title.trim();
        if normalized_title.is_empty() {
            return Err(WorkflowDomainError::EmptyTitle);
        }

        let timestamp = clock.utc();
        let id = TaskId::new();
        Ok(Self {
            id,
            title: normalized_title.to_owned(),
            description,
            stage: Stage::Editing,
            status: TaskStatus::Pending,
            assigned_to: editor,
            assigned_role: Role::Editor,
            queue_position,
            created_at: timestamp,
            due_date: sla.due_date(Stage::Editing, timestamp),
            updated_at: timestamp,
            parent_task_id: None,
            origin_task_id: id,
            attached_files,
            feedback: None,
            rejection_reason: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::StageRoleMismatch`] when the persisted
    /// role cannot work the persisted stage.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, WorkflowDomainError> {
        if data.stage.role() != data.assigned_role {
            return Err(WorkflowDomainError::StageRoleMismatch {
                stage: data.stage,
                role: data.assigned_role,
            });
        }

        Ok(Self {
            id: data.id,
            title: data.title,
            description: data.description,
            stage: data.stage,
            status: data.status,
            assigned_to: data.assigned_to,
            assigned_role: data.assigned_role,
            queue_position: data.queue_position,
            created_at: data.created_at,
            due_date: data.due_date,
            updated_at: data.updated_at,
            parent_task_id: data.parent_task_id,
            origin_task_id: data.origin_task_id,
            attached_files: data.attached_files,
            feedback: data.feedback,
            rejection_reason: data.rejection_reason,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the pipeline stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns the in-stage status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the current assignee.
    #[must_use]
    pub const fn assigned_to(&self) -> &ReviewerId {
        &self.assigned_to
    }

    /// Returns the role of the current assignee.
    #[must_use]
    pub const fn assigned_role(&self) -> Role {
        self.assigned_role
    }

    /// Returns the queue position.
    #[must_use]
    pub const fn queue_position(&self) -> QueuePosition {
        self.queue_position
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the due date.
    #[must_use]
    pub const fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the task that spawned this one, if any.
    #[must_use]
    pub const fn parent_task_id(&self) -> Option<TaskId> {
        self.parent_task_id
    }

    /// Returns the root task of this pipeline instance.
    #[must_use]
    pub const fn origin_task_id(&self) -> TaskId {
        self.origin_task_id
    }

    /// Returns `true` when this task started the pipeline instance.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_task_id.is_none()
    }

    /// Returns the attached file references in attachment order.
    #[must_use]
    pub fn attached_files(&self) -> &[AttachedFile] {
        &self.attached_files
    }

    /// Returns the approval feedback carried into this task, if any.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Returns the rejection reason carried into this task, if any.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Checks that this task accepts `event` in its current stage and status.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] when the task is
    /// completed, its stage instance is already settled, the event belongs
    /// to a different stage, or a started task is started again.
    pub fn ensure_accepts(&self, event: WorkflowEventKind) -> Result<(), WorkflowDomainError> {
        let stage_matches = event
            .source_stage()
            .is_none_or(|expected| expected == self.stage);
        let restart = event == WorkflowEventKind::Start && self.status != TaskStatus::Pending;

        if self.stage.is_terminal() || self.status.is_settled() || !stage_matches || restart {
            return Err(WorkflowDomainError::InvalidTransition {
                task_id: self.id,
                stage: self.stage,
                event,
            });
        }
        Ok(())
    }

    /// Marks the task as picked up by its assignee.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] unless the task is
    /// pending in a non-terminal stage.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.ensure_accepts(WorkflowEventKind::Start)?;
        self.status = TaskStatus::InProgress;
        self.touch(clock.utc());
        Ok(())
    }

    /// Settles the current stage instance with `status`.
    pub(crate) const fn settle(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.touch(now);
    }

    /// Moves the task into the terminal stage.
    pub(crate) const fn complete(&mut self, now: DateTime<Utc>) {
        self.stage = Stage::Completed;
        self.status = TaskStatus::Completed;
        self.touch(now);
    }

    /// Builds the task that continues this pipeline instance.
    ///
    /// The successor inherits title, description, and origin, and points at
    /// this task as its parent.
    pub(crate) fn spawn_successor(&self, next: SuccessorSpec, sla: &SlaPolicy) -> Self {
        Self {
            id: TaskId::new(),
            title: self.title.clone(),
            description: self.description.clone(),
            stage: next.stage,
            status: TaskStatus::Pending,
            assigned_to: next.assignee,
            assigned_role: next.stage.role(),
            queue_position: next.queue_position,
            created_at: next.now,
            due_date: sla.due_date(next.stage, next.now),
            updated_at: next.now,
            parent_task_id: Some(self.id),
            origin_task_id: self.origin_task_id,
            attached_files: next.attached_files,
            feedback: next.feedback,
            rejection_reason: next.rejection_reason,
        }
    }

    const fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
