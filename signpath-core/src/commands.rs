//! Command types for progress mutations.
//!
//! Commands carry caller input as received. [`crate::ProgressService`]
//! validates them before touching the store.

use chrono::{DateTime, Utc};

use crate::error::{ProgressError, Result};
use crate::progress::Attempt;
use crate::types::{AttemptOutcome, CompletionId, LearnerId};

/// Command to record an attempt at a level, optionally completing it.
#[derive(Debug, Clone)]
pub struct LevelAttempt {
    pub learner_id: LearnerId,

    /// Signed so that negative input reaches validation instead of
    /// failing to parse upstream.
    pub level: i64,

    pub outcome: AttemptOutcome,

    /// When the attempt happened. Defaults to the time of processing.
    pub timestamp: Option<DateTime<Utc>>,

    /// Practice time to add to the aggregate's total.
    pub minutes_practiced: u32,
}

impl LevelAttempt {
    #[must_use]
    pub fn new(learner_id: impl Into<LearnerId>, level: i64, outcome: AttemptOutcome) -> Self {
        Self {
            learner_id: learner_id.into(),
            level,
            outcome,
            timestamp: None,
            minutes_practiced: 0,
        }
    }

    #[must_use]
    pub fn success(learner_id: impl Into<LearnerId>, level: i64) -> Self {
        Self::new(learner_id, level, AttemptOutcome::Success)
    }

    #[must_use]
    pub fn failure(learner_id: impl Into<LearnerId>, level: i64) -> Self {
        Self::new(learner_id, level, AttemptOutcome::Failure)
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes_practiced = minutes;
        self
    }

    pub fn validated_level(&self) -> Result<u32> {
        u32::try_from(self.level)
            .map_err(|_| ProgressError::invalid(format!("level must be >= 0, got {}", self.level)))
    }

    /// Validate and build the attempt, stamping `now` when no timestamp was given.
    pub fn to_attempt(&self, now: DateTime<Utc>) -> Result<Attempt> {
        Ok(Attempt::new(
            self.validated_level()?,
            self.outcome,
            self.timestamp.unwrap_or(now),
        ))
    }
}

/// Command to record a finished lesson.
#[derive(Debug, Clone)]
pub struct CompleteLesson {
    pub learner_id: LearnerId,
    pub lesson_id: u32,
    pub score: i64,

    /// Identifies the completion across retries. Generated when absent.
    pub completion_id: Option<CompletionId>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Overrides the lesson's estimated minutes.
    pub minutes_spent: Option<u32>,
}

impl CompleteLesson {
    #[must_use]
    pub fn new(learner_id: impl Into<LearnerId>, lesson_id: u32, score: i64) -> Self {
        Self {
            learner_id: learner_id.into(),
            lesson_id,
            score,
            completion_id: None,
            completed_at: None,
            minutes_spent: None,
        }
    }

    #[must_use]
    pub fn with_completion_id(mut self, id: CompletionId) -> Self {
        self.completion_id = Some(id);
        self
    }

    #[must_use]
    pub fn at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    #[must_use]
    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes_spent = Some(minutes);
        self
    }

    pub fn validated_score(&self) -> Result<u32> {
        u32::try_from(self.score)
            .map_err(|_| ProgressError::invalid(format!("score must be >= 0, got {}", self.score)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn negative_level_is_invalid() {
        let cmd = LevelAttempt::success("u1", -1);

        let err = cmd.validated_level().unwrap_err();

        assert!(matches!(err, ProgressError::InvalidArgument(_)));
    }

    #[test]
    fn to_attempt_defaults_timestamp_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();

        let attempt = LevelAttempt::failure("u1", 2).to_attempt(now).unwrap();

        assert_eq!(attempt.level, 2);
        assert_eq!(attempt.outcome, AttemptOutcome::Failure);
        assert_eq!(attempt.timestamp, now);
    }

    #[test]
    fn to_attempt_keeps_explicit_timestamp() {
        let then = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();

        let attempt = LevelAttempt::success("u1", 0).at(then).to_attempt(now).unwrap();

        assert_eq!(attempt.timestamp, then);
    }

    #[test]
    fn negative_score_is_invalid() {
        let cmd = CompleteLesson::new("u1", 1, -5);
        assert!(matches!(
            cmd.validated_score(),
            Err(ProgressError::InvalidArgument(_))
        ));
        assert_eq!(CompleteLesson::new("u1", 1, 0).validated_score().unwrap(), 0);
    }
}
