//! Review events accepted by the workflow state machine.

use super::{AttachedFile, Role, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event submitted by a review surface against a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// The editor hands finished files to quality control.
    SubmitForReview {
        /// Files produced in this editing round.
        files: Vec<AttachedFile>,
    },
    /// Quality control accepts the work.
    Approve {
        /// Optional notes for the scheduler.
        feedback: Option<String>,
    },
    /// Quality control sends the work back to its editor.
    Reject {
        /// Mandatory explanation for the editor.
        reason: String,
    },
    /// The scheduler confirms the work has been slotted.
    ConfirmScheduled,
}

impl WorkflowEvent {
    /// Returns the payload-free kind of this event.
    #[must_use]
    pub const fn kind(&self) -> WorkflowEventKind {
        match self {
            Self::SubmitForReview { .. } => WorkflowEventKind::SubmitForReview,
            Self::Approve { .. } => WorkflowEventKind::Approve,
            Self::Reject { .. } => WorkflowEventKind::Reject,
            Self::ConfirmScheduled => WorkflowEventKind::ConfirmScheduled,
        }
    }
}

/// Payload-free event discriminant used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventKind {
    /// See [`WorkflowEvent::SubmitForReview`].
    SubmitForReview,
    /// See [`WorkflowEvent::Approve`].
    Approve,
    /// See [`WorkflowEvent::Reject`].
    Reject,
    /// See [`WorkflowEvent::ConfirmScheduled`].
    ConfirmScheduled,
    /// The assignee picks the task up within its current stage.
    Start,
}

impl WorkflowEventKind {
    /// Returns the canonical name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmitForReview => "submit_for_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ConfirmScheduled => "confirm_scheduled",
            Self::Start => "start",
        }
    }

    /// Returns the only stage this event may be applied in, if it is bound
    /// to one.
    #[must_use]
    pub const fn source_stage(self) -> Option<Stage> {
        match self {
            Self::SubmitForReview => Some(Stage::Editing),
            Self::Approve | Self::Reject => Some(Stage::QcReview),
            Self::ConfirmScheduled => Some(Stage::Scheduling),
            Self::Start => None,
        }
    }

    /// Returns how the successor task picks its assignee, or `None` when the
    /// event spawns no successor.
    #[must_use]
    pub const fn assignee_rule(self) -> Option<AssigneeRule> {
        match self {
            Self::SubmitForReview => Some(AssigneeRule::RoundRobin(Role::Qc)),
            Self::Approve => Some(AssigneeRule::RoundRobin(Role::Scheduler)),
            Self::Reject => Some(AssigneeRule::OriginalEditor),
            Self::ConfirmScheduled | Self::Start => None,
        }
    }
}

impl fmt::Display for WorkflowEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the reviewer for a successor task is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeRule {
    /// Next reviewer of the role in the shared rotation.
    RoundRobin(Role),
    /// The editor who produced the work under review, found by walking the
    /// parent chain to the nearest editing ancestor.
    OriginalEditor,
}
