//! Statistics aggregator: read-only summaries recomputed on every call.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::activity::{DailyActivity, LessonCompletion};
use crate::types::LearnerId;

/// Profile statistics for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub learner_id: LearnerId,
    pub total_lessons_completed: u64,
    pub perfect_lessons: u64,
    /// Completed lessons per category, sorted by category name.
    pub category_counts: BTreeMap<String, u64>,
    pub average_score: f64,
    pub total_minutes_practiced: u64,
    /// Distinct days with at least one recorded activity.
    pub practice_sessions: u64,
    pub experience: u64,
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl StatsSummary {
    /// Summary for a learner with no records at all.
    #[must_use]
    pub fn empty(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            total_lessons_completed: 0,
            perfect_lessons: 0,
            category_counts: BTreeMap::new(),
            average_score: 0.0,
            total_minutes_practiced: 0,
            practice_sessions: 0,
            experience: 0,
            level: 0,
            current_streak: 0,
            longest_streak: 0,
        }
    }
}

/// Fold completion and activity records into a summary.
///
/// Records belonging to other learners are ignored, so callers may pass
/// unfiltered slices.
#[must_use]
pub fn compute(
    learner_id: &LearnerId,
    completions: &[LessonCompletion],
    activity: &[DailyActivity],
    account: Option<&Account>,
) -> StatsSummary {
    let mut summary = StatsSummary::empty(learner_id.clone());

    let mut score_sum = 0u64;
    for record in completions.iter().filter(|c| &c.learner_id == learner_id) {
        summary.total_lessons_completed += 1;
        if record.is_perfect {
            summary.perfect_lessons += 1;
        }
        *summary
            .category_counts
            .entry(record.category.clone())
            .or_default() += 1;
        score_sum += u64::from(record.score);
    }
    if summary.total_lessons_completed > 0 {
        summary.average_score = score_sum as f64 / summary.total_lessons_completed as f64;
    }

    let mut days = BTreeSet::new();
    for day in activity.iter().filter(|a| a.learner_id() == learner_id) {
        summary.total_minutes_practiced += day.minutes_practiced();
        days.insert(day.date());
    }
    summary.practice_sessions = days.len() as u64;

    if let Some(account) = account {
        summary.experience = account.experience();
        summary.level = account.level();
        summary.current_streak = account.current_streak();
        summary.longest_streak = account.longest_streak();
    }

    summary
}
