//! Stage service-level offsets used to derive task due dates.

use super::Stage;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Number of days each stage has before its task falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    /// Days allowed for an editing round.
    pub editing_days: u32,
    /// Days allowed for a quality-control review.
    pub qc_review_days: u32,
    /// Days allowed for scheduling.
    pub scheduling_days: u32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            editing_days: 1,
            qc_review_days: 1,
            scheduling_days: 2,
        }
    }
}

impl SlaPolicy {
    /// Returns the offset for tasks entering `stage`, or `None` for the
    /// terminal stage.
    #[must_use]
    pub fn offset(&self, stage: Stage) -> Option<TimeDelta> {
        let days = match stage {
            Stage::Editing => self.editing_days,
            Stage::QcReview => self.qc_review_days,
            Stage::Scheduling => self.scheduling_days,
            Stage::Completed => return None,
        };
        Some(TimeDelta::days(i64::from(days)))
    }

    /// Returns the due date of a task entering `stage` at `created_at`.
    ///
    /// The terminal stage has no deadline of its own, so `created_at` is
    /// returned unchanged.
    #[must_use]
    pub fn due_date(&self, stage: Stage, created_at: DateTime<Utc>) -> DateTime<Utc> {
        self.offset(stage)
            .and_then(|offset| created_at.checked_add_signed(offset))
            .unwrap_or(created_at)
    }
}
