//! Learner account fields consumed by the streak and experience engines.
//!
//! The account document belongs to the identity subsystem. This crate
//! only touches the gamification fields; `level` in particular can only
//! change through [`crate::experience`].

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::experience::level_for_experience;
use crate::types::{CompletionId, LearnerId};

/// Daily lesson target used when registration does not specify one.
pub const DEFAULT_DAILY_GOAL: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    learner_id: LearnerId,
    pub(crate) level: u32,
    pub(crate) experience: u64,
    pub(crate) current_streak: u32,
    pub(crate) longest_streak: u32,
    /// Date only, UTC. Absent until the first completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_active_date: Option<NaiveDate>,
    daily_goal: u32,
    pub(crate) today_progress: u32,
    /// Completions already applied to this account, oldest first.
    #[serde(default)]
    recent_completions: VecDeque<CompletionId>,
    #[serde(default)]
    version: u64,
}

impl Account {
    /// A freshly registered account: level 1, no experience, no streak.
    #[must_use]
    pub fn new(learner_id: LearnerId, daily_goal: u32) -> Self {
        Self {
            learner_id,
            level: level_for_experience(0),
            experience: 0,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            daily_goal,
            today_progress: 0,
            recent_completions: VecDeque::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn experience(&self) -> u64 {
        self.experience
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn last_active_date(&self) -> Option<NaiveDate> {
        self.last_active_date
    }

    #[must_use]
    pub fn daily_goal(&self) -> u32 {
        self.daily_goal
    }

    /// Lessons completed on the learner's last active day.
    #[must_use]
    pub fn today_progress(&self) -> u32 {
        self.today_progress
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Whether this completion has already been applied.
    #[must_use]
    pub fn has_applied(&self, id: &CompletionId) -> bool {
        self.recent_completions.contains(id)
    }

    /// Count a lesson completed on `date` toward today's progress.
    ///
    /// Only lessons on the last active day count; the streak engine has
    /// already reset the counter when `date` started a new day.
    pub(crate) fn count_lesson(&mut self, date: NaiveDate) {
        if self.last_active_date == Some(date) {
            self.today_progress += 1;
        }
    }

    /// Remember an applied completion, keeping at most `window` entries.
    pub(crate) fn remember_completion(&mut self, id: CompletionId, window: usize) {
        self.recent_completions.push_back(id);
        while self.recent_completions.len() > window.max(1) {
            self.recent_completions.pop_front();
        }
    }
}
