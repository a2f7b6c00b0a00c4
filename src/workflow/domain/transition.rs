//! Pure state machine for the review pipeline.
//!
//! `Editing -> QcReview -> Scheduling -> Completed`, with the back edge
//! `QcReview -> Editing` on rejection. A transition is planned in two steps:
//! [`begin_transition`] validates the event against the source task and
//! reports how the successor's reviewer must be chosen; the caller resolves
//! the reviewer and queue position and then finishes the plan. Nothing in
//! this module performs I/O.

use super::{
    AssigneeRule, AttachedFile, QueuePosition, ReviewerId, SlaPolicy, Stage, Task, TaskId,
    TaskStatus, WorkflowDomainError, WorkflowEvent, WorkflowEventKind,
    task::SuccessorSpec,
};
use chrono::{DateTime, Utc};

/// Validated transition awaiting its reviewer and queue slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTransition {
    /// The event produces a successor task.
    Spawn(SpawnTransition),
    /// The event closes the pipeline instance.
    Close(CloseTransition),
}

/// Transition that settles the source task and creates a successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnTransition {
    source: Task,
    event: WorkflowEventKind,
    settled_status: TaskStatus,
    successor_stage: Stage,
    rule: AssigneeRule,
    attached_files: Vec<AttachedFile>,
    feedback: Option<String>,
    rejection_reason: Option<String>,
}

/// Transition that moves the source task into the terminal stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseTransition {
    source: Task,
}

/// Fully planned transition ready to be committed as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Event that produced the plan.
    pub event: WorkflowEventKind,
    /// Source task after the transition.
    pub source: Task,
    /// Newly created task, if the event spawns one.
    pub successor: Option<Task>,
}

impl TransitionPlan {
    /// Returns every record the plan writes, source first.
    #[must_use]
    pub fn writes(&self) -> Vec<Task> {
        std::iter::once(self.source.clone())
            .chain(self.successor.clone())
            .collect()
    }

    /// Returns the origin of a pipeline instance this plan finishes.
    #[must_use]
    pub fn completed_origin(&self) -> Option<TaskId> {
        self.source
            .stage()
            .is_terminal()
            .then(|| self.source.origin_task_id())
    }
}

/// Validates `event` against `source` and prepares the transition.
///
/// # Errors
///
/// Returns [`WorkflowDomainError::InvalidTransition`] when the event is not
/// valid in the task's stage or status, [`WorkflowDomainError::MissingFeedback`]
/// when a rejection has an empty reason, and
/// [`WorkflowDomainError::NoFilesAttached`] when a submission would leave QC
/// with nothing to review.
pub fn begin_transition(
    source: &Task,
    event: WorkflowEvent,
) -> Result<PendingTransition, WorkflowDomainError> {
    let kind = event.kind();
    source.ensure_accepts(kind)?;

    let (settled_status, successor_stage, attached_files, feedback, rejection_reason) =
        match event {
            WorkflowEvent::SubmitForReview { files } => {
                let merged = merge_files(source.attached_files(), files);
                if merged.is_empty() {
                    return Err(WorkflowDomainError::NoFilesAttached(source.id()));
                }
                (TaskStatus::Completed, Stage::QcReview, merged, None, None)
            }
            WorkflowEvent::Approve { feedback } => (
                TaskStatus::Approved,
                Stage::Scheduling,
                source.attached_files().to_vec(),
                normalize_note(feedback),
                None,
            ),
            WorkflowEvent::Reject { reason } => {
                let trimmed = reason.trim();
                if trimmed.is_empty() {
                    return Err(WorkflowDomainError::MissingFeedback);
                }
                (
                    TaskStatus::Rejected,
                    Stage::Editing,
                    source.attached_files().to_vec(),
                    None,
                    Some(trimmed.to_owned()),
                )
            }
            WorkflowEvent::ConfirmScheduled => {
                return Ok(PendingTransition::Close(CloseTransition {
                    source: source.clone(),
                }));
            }
        };

    let rule = kind
        .assignee_rule()
        .ok_or(WorkflowDomainError::InvalidTransition {
            task_id: source.id(),
            stage: source.stage(),
            event: kind,
        })?;

    Ok(PendingTransition::Spawn(SpawnTransition {
        source: source.clone(),
        event: kind,
        settled_status,
        successor_stage,
        rule,
        attached_files,
        feedback,
        rejection_reason,
    }))
}

impl SpawnTransition {
    /// Returns how the successor's reviewer must be chosen.
    #[must_use]
    pub const fn assignee_rule(&self) -> AssigneeRule {
        self.rule
    }

    /// Returns the stage the successor task enters.
    #[must_use]
    pub const fn successor_stage(&self) -> Stage {
        self.successor_stage
    }

    /// Returns the task the transition was started from.
    #[must_use]
    pub const fn source(&self) -> &Task {
        &self.source
    }

    /// Settles the source task and builds its successor.
    #[must_use]
    pub fn finish(
        self,
        assignee: ReviewerId,
        queue_position: QueuePosition,
        now: DateTime<Utc>,
        sla: &SlaPolicy,
    ) -> TransitionPlan {
        let Self {
            mut source,
            event,
            settled_status,
            successor_stage,
            attached_files,
            feedback,
            rejection_reason,
            ..
        } = self;

        source.settle(settled_status, now);
        let successor = source.spawn_successor(
            SuccessorSpec {
                stage: successor_stage,
                assignee,
                queue_position,
                attached_files,
                feedback,
                rejection_reason,
                now,
            },
            sla,
        );

        TransitionPlan {
            event,
            source,
            successor: Some(successor),
        }
    }
}

impl CloseTransition {
    /// Returns the task the transition was started from.
    #[must_use]
    pub const fn source(&self) -> &Task {
        &self.source
    }

    /// Moves the source task into the terminal stage.
    #[must_use]
    pub fn finish(self, now: DateTime<Utc>) -> TransitionPlan {
        let mut source = self.source;
        source.complete(now);
        TransitionPlan {
            event: WorkflowEventKind::ConfirmScheduled,
            source,
            successor: None,
        }
    }
}

/// Appends submitted files to the existing ones, skipping ids already
/// attached.
fn merge_files(existing: &[AttachedFile], submitted: Vec<AttachedFile>) -> Vec<AttachedFile> {
    let mut merged = existing.to_vec();
    for file in submitted {
        if merged.iter().all(|present| present.id() != file.id()) {
            merged.push(file);
        }
    }
    merged
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
