//! Policy knobs for the progress service.

use serde::{Deserialize, Serialize};

use crate::account::DEFAULT_DAILY_GOAL;

/// Configuration for [`crate::ProgressService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Fraction of the lesson's total points that counts as perfect.
    #[serde(default = "default_perfect_threshold")]
    pub perfect_threshold: f64,

    /// Extra attempts after a version conflict before giving up.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Daily lesson goal for accounts registered without one.
    #[serde(default = "default_daily_goal")]
    pub default_daily_goal: u32,

    /// How many applied completion ids an account remembers.
    #[serde(default = "default_recent_completion_window")]
    pub recent_completion_window: usize,
}

fn default_perfect_threshold() -> f64 {
    0.9
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_daily_goal() -> u32 {
    DEFAULT_DAILY_GOAL
}

fn default_recent_completion_window() -> usize {
    64
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            perfect_threshold: default_perfect_threshold(),
            max_conflict_retries: default_max_conflict_retries(),
            default_daily_goal: default_daily_goal(),
            recent_completion_window: default_recent_completion_window(),
        }
    }
}

impl ProgressConfig {
    #[must_use]
    pub fn with_perfect_threshold(mut self, threshold: f64) -> Self {
        self.perfect_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    #[must_use]
    pub fn with_default_daily_goal(mut self, goal: u32) -> Self {
        self.default_daily_goal = goal;
        self
    }

    #[must_use]
    pub fn with_recent_completion_window(mut self, window: usize) -> Self {
        self.recent_completion_window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = ProgressConfig::default();

        assert!((config.perfect_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.default_daily_goal, 5);
        assert_eq!(config.recent_completion_window, 64);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ProgressConfig::default()
            .with_perfect_threshold(1.0)
            .with_max_conflict_retries(0)
            .with_default_daily_goal(3)
            .with_recent_completion_window(8);

        assert!((config.perfect_threshold - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.max_conflict_retries, 0);
        assert_eq!(config.default_daily_goal, 3);
        assert_eq!(config.recent_completion_window, 8);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ProgressConfig = toml::from_str("max_conflict_retries = 7").unwrap();

        assert_eq!(config.max_conflict_retries, 7);
        assert_eq!(config.default_daily_goal, 5);
    }
}
