//! Shared builders for workflow unit tests.

use crate::workflow::{
    config::{RetryPolicy, WorkflowConfig},
    domain::{AttachedFile, FileUpload, ReviewerId, ReviewerRoster, Role},
};
use mockable::DefaultClock;

/// Builds a reviewer identifier, panicking on invalid test input.
pub fn reviewer(name: &str) -> ReviewerId {
    ReviewerId::new(name).expect("valid reviewer id")
}

/// Roster with one editor, two QC reviewers, and one scheduler.
pub fn studio_roster() -> ReviewerRoster {
    ReviewerRoster::new()
        .with_role(Role::Editor, [reviewer("erin"), reviewer("eli")])
        .with_role(Role::Qc, [reviewer("quinn"), reviewer("quade")])
        .with_role(Role::Scheduler, [reviewer("sasha")])
}

/// Configuration over [`studio_roster`] that retries without pausing.
pub fn studio_config() -> WorkflowConfig {
    WorkflowConfig::new(studio_roster()).with_retry(RetryPolicy::immediate(3))
}

/// Builds a file reference uploaded by `uploader`.
pub fn file(name: &str, uploader: &str) -> AttachedFile {
    AttachedFile::new(
        FileUpload {
            name: name.to_owned(),
            url: format!("store://media/{name}"),
            uploaded_by: reviewer(uploader),
            size: 4096,
            mime_type: "video/mp4".to_owned(),
        },
        &DefaultClock,
    )
    .expect("valid file upload")
}
