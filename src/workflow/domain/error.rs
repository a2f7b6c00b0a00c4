//! Error types for workflow domain validation and parsing.

use super::{Role, Stage, TaskId, WorkflowEventKind};
use thiserror::Error;

/// Errors returned while constructing or transitioning workflow tasks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The reviewer identifier is empty after trimming.
    #[error("reviewer identifier must not be empty")]
    EmptyReviewerId,

    /// The attached file has no name.
    #[error("file name must not be empty")]
    EmptyFileName,

    /// The attached file has no location handle.
    #[error("file url must not be empty")]
    EmptyFileUrl,

    /// The attached file has no MIME type.
    #[error("file mime type must not be empty")]
    EmptyMimeType,

    /// The event is not accepted by the task in its current stage and status.
    #[error("task {task_id} in stage {stage} cannot accept event {event}")]
    InvalidTransition {
        /// Task the event was applied to.
        task_id: TaskId,
        /// Stage the task was in.
        stage: Stage,
        /// Event that was attempted.
        event: WorkflowEventKind,
    },

    /// A rejection was submitted without a reason.
    #[error("rejection reason must not be empty")]
    MissingFeedback,

    /// A review submission would produce a QC task with nothing to review.
    #[error("task {0} has no files to submit for review")]
    NoFilesAttached(TaskId),

    /// A persisted record pairs a stage with a role that cannot work it.
    #[error("stage {stage} cannot be assigned to role {role}")]
    StageRoleMismatch {
        /// Persisted stage.
        stage: Stage,
        /// Persisted role.
        role: Role,
    },
}

/// Error returned while parsing workflow stages from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workflow stage: {0}")]
pub struct ParseStageError(pub String);

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(pub String);

/// Error returned while parsing reviewer roles from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown reviewer role: {0}")]
pub struct ParseRoleError(pub String);
