//! Pipeline stage, in-stage status, and reviewer role enumerations.

use super::{ParseRoleError, ParseStageError, ParseStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a task in the review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// An editor is producing or revising the work.
    Editing,
    /// A quality-control reviewer is checking the submitted files.
    QcReview,
    /// A scheduler is slotting the approved work for release.
    Scheduling,
    /// The pipeline instance has finished.
    Completed,
}

impl Stage {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::QcReview => "qc_review",
            Self::Scheduling => "scheduling",
            Self::Completed => "completed",
        }
    }

    /// Returns the role that works tasks in this stage.
    ///
    /// Completed tasks keep the scheduler role that closed them.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Editing => Role::Editor,
            Self::QcReview => Role::Qc,
            Self::Scheduling | Self::Completed => Role::Scheduler,
        }
    }

    /// Returns `true` when no further transitions may leave this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl TryFrom<&str> for Stage {
    type Error = ParseStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "editing" => Ok(Self::Editing),
            "qc_review" => Ok(Self::QcReview),
            "scheduling" => Ok(Self::Scheduling),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseStageError(value.to_owned())),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a task within its current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the role queue.
    Pending,
    /// Picked up by the assignee.
    InProgress,
    /// Work for this stage is finished.
    Completed,
    /// QC accepted the work.
    Approved,
    /// QC sent the work back to the editor.
    Rejected,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` when the stage instance has been decided and accepts
    /// no further events.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Approved | Self::Rejected)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer role owning a stage queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Produces and revises the work.
    Editor,
    /// Performs quality-control review.
    Qc,
    /// Schedules approved work.
    Scheduler,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Qc => "qc",
            Self::Scheduler => "scheduler",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "editor" => Ok(Self::Editor),
            "qc" => Ok(Self::Qc),
            "scheduler" => Ok(Self::Scheduler),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
