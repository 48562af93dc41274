//! Learner progress tracking for signpath.
//!
//! This crate records what a learner has done and derives what they have
//! earned from it: completed levels, attempts, daily streaks, experience
//! and level, and profile statistics.
//!
//! # Architecture
//!
//! - **Aggregate** ([`ProgressAggregate`]) holds one learner's completed
//!   levels, attempt history and counters
//! - **Engines** ([`completion`], [`streak`], [`experience`], [`stats`])
//!   are pure functions over the records
//! - **Storage** ([`ProgressStore`]) persists versioned documents with
//!   insert-if-absent and conditional replace
//! - **Service** ([`ProgressService`]) serializes work per learner and
//!   retries on version conflicts

mod account;
mod activity;
mod catalog;
mod commands;
pub mod compat;
pub mod completion;
mod config;
mod error;
pub mod experience;
mod locks;
mod progress;
mod service;
pub mod stats;
pub mod storage;
pub mod streak;
mod types;

// Records
pub use account::{Account, DEFAULT_DAILY_GOAL};
pub use activity::{is_perfect, Badge, DailyActivity, LessonCompletion};
pub use progress::{Attempt, ProgressAggregate, ProgressStats};

// Catalog and configuration
pub use catalog::{CatalogError, Lesson, LessonCatalog};
pub use config::ProgressConfig;

// Commands
pub use commands::{CompleteLesson, LevelAttempt};

// Engines
pub use completion::CompletionOutcome;
pub use stats::StatsSummary;
pub use streak::StreakTransition;

// Errors
pub use error::{FailureClass, ProgressError, Result};

// Service
pub use locks::LearnerLocks;
pub use service::{LearnerProfile, LessonCompletionReport, ProgressService};

// ID types
pub use types::{AttemptOutcome, CompletionId, LearnerId};

// Storage traits (re-export from storage module)
pub use storage::{MemoryProgressStore, ProgressStore, TursoProgressStore};
