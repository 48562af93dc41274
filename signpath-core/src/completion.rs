//! Completion engine: turns a level attempt into at most one new completion.

use crate::progress::{Attempt, ProgressAggregate};

/// What a completion attempt did to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The level was added to the completion set.
    Completed {
        /// Whether the frontier pointer moved.
        advanced: bool,
    },
    /// The level had been completed before; only the attempt was recorded.
    AlreadyCompleted,
    /// The attempt failed; only the attempt was recorded.
    NotCompleted,
}

impl ProgressAggregate {
    /// Record the attempt, then complete the level if it succeeded.
    ///
    /// Membership in the completion set is checked before inserting, so
    /// applying the same successful attempt twice leaves `completed_levels`
    /// and `current_level` exactly as applying it once. The frontier moves
    /// to `level + 1` when `level >= current_level`; re-completing the
    /// frontier itself advances it.
    pub fn complete_level(&mut self, attempt: Attempt, minutes_practiced: u32) -> CompletionOutcome {
        let level = attempt.level;
        let success = attempt.outcome.is_success();
        self.record_attempt(attempt, minutes_practiced);

        if !success {
            return CompletionOutcome::NotCompleted;
        }
        if self.is_completed(level) {
            return CompletionOutcome::AlreadyCompleted;
        }

        self.insert_completed(level);
        let advanced = level >= self.current_level();
        if advanced {
            self.advance_to(level.saturating_add(1));
        }
        CompletionOutcome::Completed { advanced }
    }
}
