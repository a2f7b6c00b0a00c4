//! Attached file references carried between pipeline stages.

use super::{FileId, ReviewerId, WorkflowDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Immutable reference to a file attached to a task.
///
/// The engine copies these references between tasks; file content lives
/// behind the opaque `url` handle and is never touched here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    id: FileId,
    name: String,
    url: String,
    uploaded_at: DateTime<Utc>,
    uploaded_by: ReviewerId,
    size: u64,
    mime_type: String,
}

/// Upload details supplied by the review surface when attaching a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Display name of the file.
    pub name: String,
    /// Opaque location handle.
    pub url: String,
    /// Reviewer who uploaded the file.
    pub uploaded_by: ReviewerId,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the upload.
    pub mime_type: String,
}

/// Parameter object for reconstructing a persisted file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFileData {
    /// Persisted file identifier.
    pub id: FileId,
    /// Persisted display name.
    pub name: String,
    /// Persisted location handle.
    pub url: String,
    /// Persisted upload timestamp.
    pub uploaded_at: DateTime<Utc>,
    /// Persisted uploader.
    pub uploaded_by: ReviewerId,
    /// Persisted size in bytes.
    pub size: u64,
    /// Persisted MIME type.
    pub mime_type: String,
}

impl AttachedFile {
    /// Creates a file reference stamped with the current clock time.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowDomainError`] when the name, url, or MIME type is
    /// empty after trimming.
    pub fn new(upload: FileUpload, clock: &impl Clock) -> Result<Self, WorkflowDomainError> {
        let FileUpload {
            name,
            url,
            uploaded_by,
            size,
            mime_type,
        } = upload;

        Ok(Self {
            id: FileId::new(),
            name: non_empty(&name, WorkflowDomainError::EmptyFileName)?,
            url: non_empty(&url, WorkflowDomainError::EmptyFileUrl)?,
            uploaded_at: clock.utc(),
            uploaded_by,
            size,
            mime_type: non_empty(&mime_type, WorkflowDomainError::EmptyMimeType)?,
        })
    }

    /// Reconstructs a file reference from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedFileData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            url: data.url,
            uploaded_at: data.uploaded_at,
            uploaded_by: data.uploaded_by,
            size: data.size,
            mime_type: data.mime_type,
        }
    }

    /// Returns the file identifier.
    #[must_use]
    pub const fn id(&self) -> FileId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the opaque location handle.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the upload timestamp.
    #[must_use]
    pub const fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    /// Returns the uploader.
    #[must_use]
    pub const fn uploaded_by(&self) -> &ReviewerId {
        &self.uploaded_by
    }

    /// Returns the size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

fn non_empty(value: &str, error: WorkflowDomainError) -> Result<String, WorkflowDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(error);
    }
    Ok(trimmed.to_owned())
}
