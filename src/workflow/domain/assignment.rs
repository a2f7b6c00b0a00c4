//! Round-robin reviewer assignment.
//!
//! The roster is injected configuration. Selection is a pure function of
//! the role and a rotation key drawn from the engine's shared sequence, so
//! replaying the same keys replays the same assignments.

use super::{QueuePosition, ReviewerId, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors returned by the assignment policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    /// The role has no reviewers configured.
    #[error("no reviewers available for role {0}")]
    NoReviewersAvailable(Role),
}

/// Fixed, ordered reviewer lists per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewerRoster {
    members: BTreeMap<Role, Vec<ReviewerId>>,
}

impl ReviewerRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the reviewers for `role`, preserving their order.
    #[must_use]
    pub fn with_role(mut self, role: Role, reviewers: impl IntoIterator<Item = ReviewerId>) -> Self {
        self.members.insert(role, reviewers.into_iter().collect());
        self
    }

    /// Returns the reviewers configured for `role` in rotation order.
    #[must_use]
    pub fn reviewers(&self, role: Role) -> &[ReviewerId] {
        self.members
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Selects the reviewer for `rotation` within the role's rotation.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NoReviewersAvailable`] when the role has
    /// no reviewers.
    pub fn next_assignee(
        &self,
        role: Role,
        rotation: u64,
    ) -> Result<ReviewerId, AssignmentError> {
        let reviewers = self.reviewers(role);
        let len = u64::try_from(reviewers.len()).unwrap_or(u64::MAX);
        let slot = rotation
            .checked_rem(len)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| reviewers.get(index));
        slot.cloned()
            .ok_or(AssignmentError::NoReviewersAvailable(role))
    }

    /// Checks that every role has at least one reviewer.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NoReviewersAvailable`] for the first role
    /// whose roster is empty.
    pub fn validate(&self) -> Result<(), AssignmentError> {
        [Role::Editor, Role::Qc, Role::Scheduler]
            .into_iter()
            .find(|role| self.reviewers(*role).is_empty())
            .map_or(Ok(()), |role| Err(AssignmentError::NoReviewersAvailable(role)))
    }
}

/// Monotonic counters for queue ordering and reviewer rotation.
///
/// Every task the engine creates takes the next queue position. The rotation
/// key advances only when the round-robin policy is consulted, so a
/// rejection, which returns work to its author, consumes a queue position
/// without skipping anyone in the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSequence {
    next_position: u64,
    rotation: u64,
}

impl Default for WorkflowSequence {
    fn default() -> Self {
        Self::starting_at(1, 0)
    }
}

impl WorkflowSequence {
    /// Creates a sequence whose next queue position is `next_position` and
    /// whose next rotation key is `rotation`.
    #[must_use]
    pub const fn starting_at(next_position: u64, rotation: u64) -> Self {
        Self {
            next_position,
            rotation,
        }
    }

    /// Returns the position the next created task will receive.
    #[must_use]
    pub const fn peek_position(&self) -> QueuePosition {
        QueuePosition::new(self.next_position)
    }

    /// Returns the rotation key the next round-robin draw will use.
    #[must_use]
    pub const fn peek_rotation(&self) -> u64 {
        self.rotation
    }

    /// Takes the next queue position.
    pub const fn next_position(&mut self) -> QueuePosition {
        let position = QueuePosition::new(self.next_position);
        self.next_position = self.next_position.saturating_add(1);
        position
    }

    /// Draws the next round-robin reviewer for `role` from `roster`.
    ///
    /// The rotation key advances only when a reviewer is found.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::NoReviewersAvailable`] when the role has
    /// no reviewers.
    pub fn draw_reviewer(
        &mut self,
        roster: &ReviewerRoster,
        role: Role,
    ) -> Result<ReviewerId, AssignmentError> {
        let reviewer = roster.next_assignee(role, self.rotation)?;
        self.rotation = self.rotation.wrapping_add(1);
        Ok(reviewer)
    }
}
