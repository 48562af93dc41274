//! Daily activity, lesson completion and badge records.
//!
//! These are the inputs of the statistics aggregator. Lesson completions
//! and badges are append-only; a daily activity record is created once per
//! (learner, date) and incremented in place afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompletionId, LearnerId};

/// Activity totals for one learner on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    learner_id: LearnerId,
    date: NaiveDate,
    lessons_completed: u32,
    xp_gained: u64,
    minutes_practiced: u64,
    met_daily_goal: bool,
    /// Completions already counted in this record.
    #[serde(default)]
    completion_ids: Vec<CompletionId>,
    #[serde(default)]
    version: u64,
}

impl DailyActivity {
    #[must_use]
    pub fn new(learner_id: LearnerId, date: NaiveDate) -> Self {
        Self {
            learner_id,
            date,
            lessons_completed: 0,
            xp_gained: 0,
            minutes_practiced: 0,
            met_daily_goal: false,
            completion_ids: Vec::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn lessons_completed(&self) -> u32 {
        self.lessons_completed
    }

    #[must_use]
    pub fn xp_gained(&self) -> u64 {
        self.xp_gained
    }

    #[must_use]
    pub fn minutes_practiced(&self) -> u64 {
        self.minutes_practiced
    }

    #[must_use]
    pub fn met_daily_goal(&self) -> bool {
        self.met_daily_goal
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    #[must_use]
    pub fn has_applied(&self, id: &CompletionId) -> bool {
        self.completion_ids.contains(id)
    }

    /// Count a completed lesson. Returns `false` if the completion was
    /// already counted here, leaving the record untouched.
    pub fn apply_completion(
        &mut self,
        id: CompletionId,
        xp: u32,
        minutes: u32,
        daily_goal: u32,
    ) -> bool {
        if self.has_applied(&id) {
            return false;
        }
        self.completion_ids.push(id);
        self.lessons_completed += 1;
        self.xp_gained += u64::from(xp);
        self.minutes_practiced += u64::from(minutes);
        self.met_daily_goal = self.lessons_completed >= daily_goal;
        true
    }
}

/// One completed-lesson event. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub completion_id: CompletionId,
    pub learner_id: LearnerId,
    pub lesson_id: u32,
    pub category: String,
    pub score: u32,
    pub total_possible_points: u32,
    #[serde(default)]
    pub minutes_spent: u32,
    pub is_perfect: bool,
    pub completed_at: DateTime<Utc>,
}

/// Whether `score` reaches `threshold` (a fraction) of `total`.
///
/// A lesson with no scorable points is never perfect.
#[must_use]
pub fn is_perfect(score: u32, total: u32, threshold: f64) -> bool {
    total > 0 && f64::from(score) >= threshold * f64::from(total)
}

/// A badge awarded by the achievement subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub learner_id: LearnerId,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub reason: String,
    pub earned_at: DateTime<Utc>,
}
