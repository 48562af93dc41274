//! Streak engine: day-boundary transitions over `last_active_date`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::account::Account;

/// Which branch a qualifying activity took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// Activity on the day already counted; counters unchanged.
    SameDay,
    /// Activity on the day after the last active day.
    Consecutive,
    /// First activity ever, or the streak was broken by a gap.
    Reset,
}

impl StreakTransition {
    /// Whether this activity falls on a day not yet counted.
    #[must_use]
    pub fn starts_new_day(&self) -> bool {
        !matches!(self, Self::SameDay)
    }
}

/// Classify an activity on `today` against the last active day.
///
/// Days earlier than `last_active` (replayed or skewed events) count as
/// the same day so the counters never move backwards.
#[must_use]
pub fn classify(last_active: Option<NaiveDate>, today: NaiveDate) -> StreakTransition {
    match last_active {
        None => StreakTransition::Reset,
        Some(last) if today <= last => StreakTransition::SameDay,
        Some(last) if last.succ_opt() == Some(today) => StreakTransition::Consecutive,
        Some(_) => StreakTransition::Reset,
    }
}

/// Apply the transition for an activity on `today`.
///
/// `longest_streak` only moves on the consecutive-day branch. A new day
/// also clears `today_progress`.
pub fn apply(account: &mut Account, today: NaiveDate) -> StreakTransition {
    let transition = classify(account.last_active_date, today);
    match transition {
        StreakTransition::SameDay => {}
        StreakTransition::Consecutive => {
            account.current_streak += 1;
            account.last_active_date = Some(today);
            account.today_progress = 0;
            if account.current_streak > account.longest_streak {
                account.longest_streak = account.current_streak;
            }
        }
        StreakTransition::Reset => {
            account.current_streak = 1;
            account.last_active_date = Some(today);
            account.today_progress = 0;
        }
    }
    transition
}
