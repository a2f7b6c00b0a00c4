//! Engine configuration: reviewer rosters, stage SLAs, and retry budget.
//!
//! # Examples
//!
//! ```
//! use reelflow::workflow::config::WorkflowConfig;
//!
//! let config = WorkflowConfig::from_json_str(
//!     r#"{
//!         "roster": {
//!             "editor": ["ed"],
//!             "qc": ["qa-1", "qa-2"],
//!             "scheduler": ["sam"]
//!         },
//!         "sla": { "scheduling_days": 3 }
//!     }"#,
//! )
//! .expect("valid configuration");
//! assert_eq!(config.sla.scheduling_days, 3);
//! assert_eq!(config.sla.editing_days, 1);
//! assert_eq!(config.retry.max_attempts, 3);
//! ```

use crate::workflow::domain::{AssignmentError, ReviewerRoster, SlaPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Bounded retry budget for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 25,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy that retries without pausing.
    ///
    /// Useful for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_ms: 0,
        }
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum WorkflowConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid workflow configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A role has no reviewers.
    #[error(transparent)]
    Roster(#[from] AssignmentError),

    /// The retry budget allows no attempt at all.
    #[error("retry policy must allow at least one attempt")]
    ZeroAttempts,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Reviewers per role in rotation order.
    pub roster: ReviewerRoster,
    /// Due-date offsets per stage.
    #[serde(default)]
    pub sla: SlaPolicy,
    /// Retry budget for transient store failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl WorkflowConfig {
    /// Creates a configuration with default SLA and retry settings.
    #[must_use]
    pub fn new(roster: ReviewerRoster) -> Self {
        Self {
            roster,
            sla: SlaPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the SLA policy.
    #[must_use]
    pub const fn with_sla(mut self, sla: SlaPolicy) -> Self {
        self.sla = sla;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowConfigError`] when the document is malformed or
    /// fails [`WorkflowConfig::validate`].
    pub fn from_json_str(document: &str) -> Result<Self, WorkflowConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every role can be staffed and retries are possible.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowConfigError::Roster`] for an empty role roster and
    /// [`WorkflowConfigError::ZeroAttempts`] for an unusable retry budget.
    pub fn validate(&self) -> Result<(), WorkflowConfigError> {
        self.roster.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(WorkflowConfigError::ZeroAttempts);
        }
        Ok(())
    }
}
