//! Progress service: the operations exposed to the transport layer.
//!
//! [`ProgressService`] owns the read-modify-write sequences. Each mutation
//! holds the learner's lock for its whole duration and retries the whole
//! sequence when the store reports a version conflict.

use std::future::Future;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::activity::{self, Badge, DailyActivity, LessonCompletion};
use crate::catalog::{Lesson, LessonCatalog};
use crate::commands::{CompleteLesson, LevelAttempt};
use crate::completion::CompletionOutcome;
use crate::config::ProgressConfig;
use crate::error::{ProgressError, Result};
use crate::experience;
use crate::locks::LearnerLocks;
use crate::progress::{Attempt, ProgressAggregate};
use crate::stats::{self, StatsSummary};
use crate::storage::{account_key, ProgressStore};
use crate::streak::{self, StreakTransition};
use crate::types::{CompletionId, LearnerId};

/// Number of lesson records shown on a profile.
const PROFILE_RECENT_LESSONS: usize = 10;

/// Everything a lesson completion touched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionReport {
    pub record: LessonCompletion,
    pub account: Account,
    pub activity: DailyActivity,
    /// `None` when the account had already applied this completion.
    pub streak: Option<StreakTransition>,
}

/// Profile view of a learner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub account: Account,
    pub stats: StatsSummary,
    pub badges: Vec<Badge>,
    pub recent_lessons: Vec<LessonCompletion>,
}

/// Coordinates the engines over a [`ProgressStore`].
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
    catalog: Arc<LessonCatalog>,
    config: ProgressConfig,
    locks: LearnerLocks,
}

impl ProgressService {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        catalog: Arc<LessonCatalog>,
        config: ProgressConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
            locks: LearnerLocks::new(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &LessonCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Run `op` again after each version conflict, up to the configured budget.
    async fn retry_conflicts<T, F, Fut>(
        &self,
        operation: &'static str,
        learner_id: &LearnerId,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Err(ProgressError::Conflict(reason)) if retries < self.config.max_conflict_retries => {
                    retries += 1;
                    debug!(%learner_id, operation, retries, %reason, "version conflict, retrying");
                }
                Err(ProgressError::Conflict(reason)) => {
                    warn!(%learner_id, operation, retries, %reason, "giving up after repeated version conflicts");
                    return Err(ProgressError::Conflict(reason));
                }
                other => return other,
            }
        }
    }

    // === Progress aggregate ===

    /// The learner's aggregate, created zero-valued on first access.
    pub async fn get_progress(&self, learner_id: &LearnerId) -> Result<ProgressAggregate> {
        Ok(self.store.get_or_create_progress(learner_id).await?)
    }

    /// Every stored aggregate.
    pub async fn get_all_progress(&self) -> Result<Vec<ProgressAggregate>> {
        Ok(self.store.list_progress().await?)
    }

    /// Append an attempt without touching the completion set.
    pub async fn record_attempt(&self, cmd: LevelAttempt) -> Result<ProgressAggregate> {
        let attempt = cmd.to_attempt(Utc::now())?;
        let _guard = self.locks.lock(&cmd.learner_id).await;

        let (progress, _) = self
            .retry_conflicts("record_attempt", &cmd.learner_id, || {
                self.try_apply_attempt(&cmd, &attempt, false)
            })
            .await?;

        debug!(
            learner_id = %cmd.learner_id,
            level = attempt.level,
            outcome = %attempt.outcome,
            "attempt recorded"
        );
        Ok(progress)
    }

    /// Record the attempt and, on success, complete the level.
    pub async fn complete_level(&self, cmd: LevelAttempt) -> Result<ProgressAggregate> {
        let attempt = cmd.to_attempt(Utc::now())?;
        let _guard = self.locks.lock(&cmd.learner_id).await;

        let (progress, outcome) = self
            .retry_conflicts("complete_level", &cmd.learner_id, || {
                self.try_apply_attempt(&cmd, &attempt, true)
            })
            .await?;

        match outcome {
            Some(CompletionOutcome::Completed { advanced }) => info!(
                learner_id = %cmd.learner_id,
                level = attempt.level,
                current_level = progress.current_level(),
                advanced,
                "level completed"
            ),
            Some(CompletionOutcome::AlreadyCompleted) => debug!(
                learner_id = %cmd.learner_id,
                level = attempt.level,
                "level already completed"
            ),
            _ => debug!(learner_id = %cmd.learner_id, level = attempt.level, "attempt failed"),
        }
        Ok(progress)
    }

    async fn try_apply_attempt(
        &self,
        cmd: &LevelAttempt,
        attempt: &Attempt,
        complete: bool,
    ) -> Result<(ProgressAggregate, Option<CompletionOutcome>)> {
        let mut progress = self.store.get_or_create_progress(&cmd.learner_id).await?;
        let outcome = if complete {
            Some(progress.complete_level(attempt.clone(), cmd.minutes_practiced))
        } else {
            progress.record_attempt(attempt.clone(), cmd.minutes_practiced);
            None
        };
        let version = self.store.replace_progress(&progress).await?;
        progress.set_version(version);
        Ok((progress, outcome))
    }

    // === Account ===

    /// Create the learner's account if it does not exist yet.
    ///
    /// Returns the stored account either way.
    pub async fn register_account(
        &self,
        learner_id: &LearnerId,
        daily_goal: Option<u32>,
    ) -> Result<Account> {
        let daily_goal = daily_goal.unwrap_or(self.config.default_daily_goal);
        if daily_goal == 0 {
            return Err(ProgressError::invalid("daily goal must be at least 1"));
        }

        let account = Account::new(learner_id.clone(), daily_goal);
        if self.store.insert_account(&account).await? {
            info!(%learner_id, daily_goal, "account registered");
            return Ok(account);
        }
        self.require_account(learner_id).await
    }

    async fn require_account(&self, learner_id: &LearnerId) -> Result<Account> {
        self.store
            .get_account(learner_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(account_key(learner_id)))
    }

    /// Add experience points and recompute the level.
    pub async fn grant_experience(&self, learner_id: &LearnerId, points: i64) -> Result<Account> {
        experience::validate_points(points)?;
        let _guard = self.locks.lock(learner_id).await;

        let account = self
            .retry_conflicts("grant_experience", learner_id, || {
                self.try_grant_experience(learner_id, points)
            })
            .await?;

        debug!(%learner_id, points, level = account.level(), "experience granted");
        Ok(account)
    }

    async fn try_grant_experience(&self, learner_id: &LearnerId, points: i64) -> Result<Account> {
        let mut account = self.require_account(learner_id).await?;
        experience::grant(&mut account, points)?;
        let version = self.store.replace_account(&account).await?;
        account.set_version(version);
        Ok(account)
    }

    /// Apply only the streak transition for activity on `today`.
    pub async fn update_streak(
        &self,
        learner_id: &LearnerId,
        today: NaiveDate,
    ) -> Result<(Account, StreakTransition)> {
        let _guard = self.locks.lock(learner_id).await;

        let (account, transition) = self
            .retry_conflicts("update_streak", learner_id, || {
                self.try_update_streak(learner_id, today)
            })
            .await?;

        debug!(%learner_id, ?transition, current_streak = account.current_streak(), "streak updated");
        Ok((account, transition))
    }

    async fn try_update_streak(
        &self,
        learner_id: &LearnerId,
        today: NaiveDate,
    ) -> Result<(Account, StreakTransition)> {
        let mut account = self.require_account(learner_id).await?;
        let transition = streak::apply(&mut account, today);
        if transition.starts_new_day() {
            let version = self.store.replace_account(&account).await?;
            account.set_version(version);
        }
        Ok((account, transition))
    }

    // === Lesson completion ===

    /// Record a finished lesson and update the account and the day's activity.
    ///
    /// The three writes are not atomic. Each is keyed on the completion id,
    /// so re-running a command with the same id after a failure finishes
    /// the missing steps without counting anything twice.
    pub async fn complete_lesson(&self, cmd: CompleteLesson) -> Result<LessonCompletionReport> {
        let score = cmd.validated_score()?;
        let lesson = self.catalog.get(cmd.lesson_id).ok_or_else(|| {
            ProgressError::invalid(format!("unknown lesson: {}", cmd.lesson_id))
        })?;
        let learner_id = &cmd.learner_id;
        let _guard = self.locks.lock(learner_id).await;

        // Fail before writing anything for an unregistered learner.
        self.require_account(learner_id).await?;

        let record = self.record_completion(&cmd, lesson, score).await?;
        let today = record.completed_at.date_naive();

        let steps = async {
            let (account, streak) = self
                .retry_conflicts("complete_lesson.account", learner_id, || {
                    self.try_apply_to_account(&record, lesson, today)
                })
                .await?;
            let activity = self
                .retry_conflicts("complete_lesson.activity", learner_id, || {
                    self.try_apply_to_activity(&record, lesson, account.daily_goal())
                })
                .await?;
            Ok::<_, ProgressError>((account, streak, activity))
        };

        let (account, streak, activity) = match steps.await {
            Ok(done) => done,
            Err(err) => {
                warn!(
                    %learner_id,
                    completion_id = %record.completion_id,
                    error = %err,
                    "lesson completion partially applied; retry with the same completion id"
                );
                return Err(err);
            }
        };

        info!(
            %learner_id,
            lesson_id = lesson.id,
            completion_id = %record.completion_id,
            score,
            perfect = record.is_perfect,
            level = account.level(),
            current_streak = account.current_streak(),
            "lesson completed"
        );
        Ok(LessonCompletionReport {
            record,
            account,
            activity,
            streak,
        })
    }

    /// Insert the completion record, or return the one stored under the same id.
    async fn record_completion(
        &self,
        cmd: &CompleteLesson,
        lesson: &Lesson,
        score: u32,
    ) -> Result<LessonCompletion> {
        let completion_id = cmd.completion_id.unwrap_or_default();
        let record = LessonCompletion {
            completion_id,
            learner_id: cmd.learner_id.clone(),
            lesson_id: lesson.id,
            category: lesson.category.clone(),
            score,
            total_possible_points: lesson.total_points,
            minutes_spent: cmd.minutes_spent.unwrap_or(lesson.estimated_minutes),
            is_perfect: activity::is_perfect(score, lesson.total_points, self.config.perfect_threshold),
            completed_at: cmd.completed_at.unwrap_or_else(Utc::now),
        };

        if self.store.insert_completion(&record).await? {
            return Ok(record);
        }

        debug!(%completion_id, "completion already recorded, resuming");
        let stored = self
            .store
            .list_completions(&cmd.learner_id)
            .await?
            .into_iter()
            .find(|stored| stored.completion_id == completion_id)
            .ok_or_else(|| {
                ProgressError::invalid(format!(
                    "completion {completion_id} belongs to another learner"
                ))
            })?;
        if stored.lesson_id != lesson.id {
            return Err(ProgressError::invalid(format!(
                "completion {completion_id} was recorded for lesson {}, not {}",
                stored.lesson_id, lesson.id
            )));
        }
        Ok(stored)
    }

    async fn try_apply_to_account(
        &self,
        record: &LessonCompletion,
        lesson: &Lesson,
        today: NaiveDate,
    ) -> Result<(Account, Option<StreakTransition>)> {
        let mut account = self.require_account(&record.learner_id).await?;
        if account.has_applied(&record.completion_id) {
            return Ok((account, None));
        }

        let transition = streak::apply(&mut account, today);
        experience::grant(&mut account, i64::from(lesson.experience_points))?;
        account.count_lesson(today);
        account.remember_completion(record.completion_id, self.config.recent_completion_window);

        let version = self.store.replace_account(&account).await?;
        account.set_version(version);
        Ok((account, Some(transition)))
    }

    async fn try_apply_to_activity(
        &self,
        record: &LessonCompletion,
        lesson: &Lesson,
        daily_goal: u32,
    ) -> Result<DailyActivity> {
        let today = record.completed_at.date_naive();
        let mut activity = self
            .store
            .get_or_create_activity(&record.learner_id, today)
            .await?;
        if activity.apply_completion(
            record.completion_id,
            lesson.experience_points,
            record.minutes_spent,
            daily_goal,
        ) {
            let version = self.store.replace_activity(&activity).await?;
            activity.set_version(version);
        }
        Ok(activity)
    }

    // === Reads ===

    /// Statistics recomputed from the completion and activity records.
    pub async fn get_stats(&self, learner_id: &LearnerId) -> Result<StatsSummary> {
        let completions = self.store.list_completions(learner_id).await?;
        let activity = self.store.list_activity(learner_id).await?;
        let account = self.store.get_account(learner_id).await?;
        Ok(stats::compute(
            learner_id,
            &completions,
            &activity,
            account.as_ref(),
        ))
    }

    /// Activity records from the last `days` days up to `today`, newest first.
    pub async fn get_activity_history(
        &self,
        learner_id: &LearnerId,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailyActivity>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let since = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);

        let mut history: Vec<_> = self
            .store
            .list_activity(learner_id)
            .await?
            .into_iter()
            .filter(|day| day.date() >= since && day.date() <= today)
            .collect();
        history.reverse();
        Ok(history)
    }

    /// The `limit` most recent lesson completions, newest first.
    pub async fn get_lesson_history(
        &self,
        learner_id: &LearnerId,
        limit: usize,
    ) -> Result<Vec<LessonCompletion>> {
        let mut records = self.store.list_completions(learner_id).await?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    /// Badges earned by the learner, newest first.
    pub async fn get_badges(&self, learner_id: &LearnerId) -> Result<Vec<Badge>> {
        let mut badges = self.store.list_badges(learner_id).await?;
        badges.reverse();
        Ok(badges)
    }

    /// Account, statistics, badges and recent lessons in one view.
    pub async fn get_profile(&self, learner_id: &LearnerId) -> Result<LearnerProfile> {
        let account = self.require_account(learner_id).await?;
        let completions = self.store.list_completions(learner_id).await?;
        let activity = self.store.list_activity(learner_id).await?;
        let badges = self.get_badges(learner_id).await?;

        let stats = stats::compute(learner_id, &completions, &activity, Some(&account));
        let recent_lessons = completions
            .into_iter()
            .rev()
            .take(PROFILE_RECENT_LESSONS)
            .collect();

        Ok(LearnerProfile {
            account,
            stats,
            badges,
            recent_lessons,
        })
    }

    /// Whether the account has already applied `completion_id`.
    pub async fn has_applied(&self, learner_id: &LearnerId, completion_id: CompletionId) -> Result<bool> {
        Ok(self.require_account(learner_id).await?.has_applied(&completion_id))
    }
}
