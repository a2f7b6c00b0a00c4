//! Domain model for the review pipeline.
//!
//! Tasks, file references, the reviewer rotation, and the transition state
//! machine live here with no knowledge of storage or notification plumbing.

mod assignment;
mod error;
mod event;
mod file;
mod ids;
mod sla;
mod stage;
mod task;
mod transition;

pub use assignment::{AssignmentError, ReviewerRoster, WorkflowSequence};
pub use error::{ParseRoleError, ParseStageError, ParseStatusError, WorkflowDomainError};
pub use event::{AssigneeRule, WorkflowEvent, WorkflowEventKind};
pub use file::{AttachedFile, FileUpload, PersistedFileData};
pub use ids::{FileId, QueuePosition, ReviewerId, TaskId};
pub use sla::SlaPolicy;
pub use stage::{Role, Stage, TaskStatus};
pub use task::{NewRootTask, PersistedTaskData, Task};
pub use transition::{
    CloseTransition, PendingTransition, SpawnTransition, TransitionPlan, begin_transition,
};
