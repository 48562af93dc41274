//! Experience and leveling engine.
//!
//! Level is a pure function of accumulated experience:
//! `level = floor(experience / 100) + 1`.

use crate::account::Account;
use crate::error::{ProgressError, Result};

/// Experience needed to climb one level.
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Level reached with the given total experience.
#[must_use]
pub fn level_for_experience(experience: u64) -> u32 {
    let level = experience / EXPERIENCE_PER_LEVEL + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Reject grants that would lower experience.
pub fn validate_points(points: i64) -> Result<u64> {
    u64::try_from(points).map_err(|_| {
        ProgressError::invalid(format!("experience grant must be >= 0, got {points}"))
    })
}

/// Add experience and recompute the level. Returns the new level.
pub fn grant(account: &mut Account, points: i64) -> Result<u32> {
    let points = validate_points(points)?;
    account.experience = account.experience.saturating_add(points);
    account.level = level_for_experience(account.experience);
    Ok(account.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LearnerId;

    #[test]
    fn level_is_one_with_no_experience() {
        assert_eq!(level_for_experience(0), 1);
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(250), 3);
    }

    #[test]
    fn grant_accumulates_and_levels_up() {
        let mut account = Account::new(LearnerId::new("u1"), 5);

        grant(&mut account, 150).unwrap();
        let level = grant(&mut account, 100).unwrap();

        assert_eq!(account.experience(), 250);
        assert_eq!(level, 3);
        assert_eq!(account.level(), 3);
    }

    #[test]
    fn zero_grant_is_allowed() {
        let mut account = Account::new(LearnerId::new("u1"), 5);

        grant(&mut account, 0).unwrap();

        assert_eq!(account.experience(), 0);
        assert_eq!(account.level(), 1);
    }

    #[test]
    fn negative_grant_is_rejected_without_change() {
        let mut account = Account::new(LearnerId::new("u1"), 5);
        grant(&mut account, 40).unwrap();

        let err = grant(&mut account, -10).unwrap_err();

        assert!(matches!(err, ProgressError::InvalidArgument(_)));
        assert_eq!(account.experience(), 40);
    }
}
