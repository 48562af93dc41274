//! Storage trait and implementations for progress data.
//!
//! Every mutable document (progress aggregate, account, daily activity)
//! carries a `version`. Inserts are insert-if-absent; replaces are
//! conditional on the version the caller read:
//! - [`ProgressStore`] - The persistence seam used by the service
//! - [`MemoryProgressStore`] - In-process maps, for tests and embedding
//! - [`TursoProgressStore`] - libSQL, local file or remote Turso

mod error;
mod memory;
mod turso;

pub use error::{Error, Result};
pub use memory::MemoryProgressStore;
pub use turso::TursoProgressStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::account::Account;
use crate::activity::{Badge, DailyActivity, LessonCompletion};
use crate::progress::ProgressAggregate;
use crate::types::LearnerId;

pub(crate) fn progress_key(learner_id: &LearnerId) -> String {
    format!("progress/{learner_id}")
}

pub(crate) fn account_key(learner_id: &LearnerId) -> String {
    format!("accounts/{learner_id}")
}

pub(crate) fn activity_key(learner_id: &LearnerId, date: NaiveDate) -> String {
    format!("activity/{learner_id}/{date}")
}

/// Persistence for every record family the progress service touches.
///
/// `insert_*` methods return `false` when a document with the same key
/// already exists and leave it untouched. `replace_*` methods fail with
/// [`Error::NotFound`] when the document is absent and [`Error::Conflict`]
/// when its stored version differs from the one passed in; on success they
/// return the new version.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(&self, learner_id: &LearnerId) -> Result<Option<ProgressAggregate>>;

    async fn insert_progress(&self, progress: &ProgressAggregate) -> Result<bool>;

    async fn replace_progress(&self, progress: &ProgressAggregate) -> Result<u64>;

    /// All aggregates, ordered by learner id.
    async fn list_progress(&self) -> Result<Vec<ProgressAggregate>>;

    async fn get_account(&self, learner_id: &LearnerId) -> Result<Option<Account>>;

    async fn insert_account(&self, account: &Account) -> Result<bool>;

    async fn replace_account(&self, account: &Account) -> Result<u64>;

    async fn get_activity(
        &self,
        learner_id: &LearnerId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>>;

    async fn insert_activity(&self, activity: &DailyActivity) -> Result<bool>;

    async fn replace_activity(&self, activity: &DailyActivity) -> Result<u64>;

    /// A learner's activity records, oldest date first.
    async fn list_activity(&self, learner_id: &LearnerId) -> Result<Vec<DailyActivity>>;

    /// Insert-if-absent keyed by completion id.
    async fn insert_completion(&self, completion: &LessonCompletion) -> Result<bool>;

    /// A learner's completion records, oldest first.
    async fn list_completions(&self, learner_id: &LearnerId) -> Result<Vec<LessonCompletion>>;

    async fn insert_badge(&self, badge: &Badge) -> Result<()>;

    /// A learner's badges, oldest first.
    async fn list_badges(&self, learner_id: &LearnerId) -> Result<Vec<Badge>>;

    /// Return the stored aggregate, creating a zero-valued one if absent.
    ///
    /// When two callers race on a new learner only one insert wins; the
    /// loser reads the winner's document.
    async fn get_or_create_progress(&self, learner_id: &LearnerId) -> Result<ProgressAggregate> {
        if let Some(progress) = self.get_progress(learner_id).await? {
            return Ok(progress);
        }
        let fresh = ProgressAggregate::new(learner_id.clone());
        if self.insert_progress(&fresh).await? {
            return Ok(fresh);
        }
        self.get_progress(learner_id)
            .await?
            .ok_or_else(|| Error::NotFound(progress_key(learner_id)))
    }

    /// Return the activity record for `date`, creating an empty one if absent.
    async fn get_or_create_activity(
        &self,
        learner_id: &LearnerId,
        date: NaiveDate,
    ) -> Result<DailyActivity> {
        if let Some(activity) = self.get_activity(learner_id, date).await? {
            return Ok(activity);
        }
        let fresh = DailyActivity::new(learner_id.clone(), date);
        if self.insert_activity(&fresh).await? {
            return Ok(fresh);
        }
        self.get_activity(learner_id, date)
            .await?
            .ok_or_else(|| Error::NotFound(activity_key(learner_id, date)))
    }
}
