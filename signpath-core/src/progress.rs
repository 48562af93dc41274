//! The per-learner progress aggregate and the attempt recorder.
//!
//! A [`ProgressAggregate`] is one document per learner. Its fields are
//! private: the only mutations are [`ProgressAggregate::record_attempt`]
//! and the completion engine in [`crate::completion`], which keeps the
//! counters and the completion set consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AttemptOutcome, LearnerId};

/// A single attempt at a level. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub level: u32,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
}

impl Attempt {
    #[must_use]
    pub fn new(level: u32, outcome: AttemptOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            level,
            outcome,
            timestamp,
        }
    }
}

/// Counters embedded in the aggregate, updated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_minutes_practiced: u64,
    pub total_attempts: u64,
    pub total_successes: u64,
}

/// A learner's consolidated progress document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAggregate {
    learner_id: LearnerId,
    current_level: u32,
    completed_levels: Vec<u32>,
    attempts: Vec<Attempt>,
    stats: ProgressStats,
    #[serde(default)]
    version: u64,
}

impl ProgressAggregate {
    /// Zero-valued aggregate for a learner seen for the first time.
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            current_level: 0,
            completed_levels: Vec::new(),
            attempts: Vec::new(),
            stats: ProgressStats::default(),
            version: 0,
        }
    }

    /// Rebuild from already-validated parts (legacy import).
    pub(crate) fn from_parts(
        learner_id: LearnerId,
        current_level: u32,
        completed_levels: Vec<u32>,
        attempts: Vec<Attempt>,
        stats: ProgressStats,
    ) -> Self {
        Self {
            learner_id,
            current_level,
            completed_levels,
            attempts,
            stats,
            version: 0,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    /// The frontier level: the next level the learner is expected to attempt.
    #[must_use]
    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    /// Completed levels in the order they were first completed.
    #[must_use]
    pub fn completed_levels(&self) -> &[u32] {
        &self.completed_levels
    }

    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    #[must_use]
    pub fn stats(&self) -> &ProgressStats {
        &self.stats
    }

    /// Stored document version, bumped by every successful replace.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    #[must_use]
    pub fn is_completed(&self, level: u32) -> bool {
        self.completed_levels.contains(&level)
    }

    /// Append an attempt and bump the counters.
    ///
    /// `minutes_practiced` is added to the practice total; pass 0 when the
    /// client did not time the attempt.
    pub fn record_attempt(&mut self, attempt: Attempt, minutes_practiced: u32) {
        self.stats.total_attempts += 1;
        if attempt.outcome.is_success() {
            self.stats.total_successes += 1;
        }
        self.stats.total_minutes_practiced += u64::from(minutes_practiced);
        self.attempts.push(attempt);
    }

    pub(crate) fn insert_completed(&mut self, level: u32) {
        self.completed_levels.push(level);
    }

    pub(crate) fn advance_to(&mut self, level: u32) {
        self.current_level = self.current_level.max(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn new_aggregate_is_zero_valued() {
        let progress = ProgressAggregate::new(LearnerId::new("u1"));

        assert_eq!(progress.current_level(), 0);
        assert!(progress.completed_levels().is_empty());
        assert!(progress.attempts().is_empty());
        assert_eq!(progress.stats(), &ProgressStats::default());
        assert_eq!(progress.version(), 0);
    }

    #[test]
    fn record_attempt_counts_successes_and_failures() {
        let mut progress = ProgressAggregate::new(LearnerId::new("u1"));

        progress.record_attempt(Attempt::new(0, AttemptOutcome::Failure, at(1)), 0);
        progress.record_attempt(Attempt::new(0, AttemptOutcome::Success, at(2)), 3);
        progress.record_attempt(Attempt::new(1, AttemptOutcome::Failure, at(3)), 2);

        assert_eq!(progress.stats().total_attempts, 3);
        assert_eq!(progress.stats().total_successes, 1);
        assert_eq!(progress.stats().total_minutes_practiced, 5);
        assert_eq!(progress.attempts().len(), 3);
        assert_eq!(progress.attempts()[1].outcome, AttemptOutcome::Success);
    }

    #[test]
    fn record_attempt_never_touches_completion_state() {
        let mut progress = ProgressAggregate::new(LearnerId::new("u1"));

        progress.record_attempt(Attempt::new(4, AttemptOutcome::Success, at(1)), 0);

        assert!(progress.completed_levels().is_empty());
        assert_eq!(progress.current_level(), 0);
    }

    #[test]
    fn aggregate_serializes_with_camel_case_fields() {
        let mut progress = ProgressAggregate::new(LearnerId::new("u1"));
        progress.record_attempt(Attempt::new(0, AttemptOutcome::Success, at(1)), 0);

        let json = serde_json::to_value(&progress).unwrap();

        assert_eq!(json["learnerId"], "u1");
        assert_eq!(json["currentLevel"], 0);
        assert_eq!(json["stats"]["totalAttempts"], 1);
        assert_eq!(json["stats"]["totalMinutesPracticed"], 0);
        assert_eq!(json["attempts"][0]["outcome"], "success");
    }

    #[test]
    fn aggregate_without_version_field_deserializes_at_zero() {
        let json = r#"{
            "learnerId": "u2",
            "currentLevel": 1,
            "completedLevels": [0],
            "attempts": [],
            "stats": {"totalMinutesPracticed": 0, "totalAttempts": 1, "totalSuccesses": 1}
        }"#;

        let progress: ProgressAggregate = serde_json::from_str(json).unwrap();

        assert_eq!(progress.version(), 0);
        assert_eq!(progress.completed_levels(), &[0]);
    }
}
