//! In-memory implementation of [`ProgressStore`].
//!
//! Keeps every record family in maps behind a single `RwLock`. Useful for
//! tests and for running the service without a database. Faults can be
//! injected to exercise the service's error paths.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{account_key, activity_key, progress_key, Error, ProgressStore, Result};
use crate::account::Account;
use crate::activity::{Badge, DailyActivity, LessonCompletion};
use crate::progress::ProgressAggregate;
use crate::types::{CompletionId, LearnerId};

trait Versioned: Clone {
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

impl Versioned for ProgressAggregate {
    fn version(&self) -> u64 {
        ProgressAggregate::version(self)
    }
    fn set_version(&mut self, version: u64) {
        ProgressAggregate::set_version(self, version);
    }
}

impl Versioned for Account {
    fn version(&self) -> u64 {
        Account::version(self)
    }
    fn set_version(&mut self, version: u64) {
        Account::set_version(self, version);
    }
}

impl Versioned for DailyActivity {
    fn version(&self) -> u64 {
        DailyActivity::version(self)
    }
    fn set_version(&mut self, version: u64) {
        DailyActivity::set_version(self, version);
    }
}

fn insert_absent<K: Hash + Eq, T: Clone>(map: &mut HashMap<K, T>, key: K, doc: &T) -> bool {
    if map.contains_key(&key) {
        return false;
    }
    map.insert(key, doc.clone());
    true
}

fn replace_versioned<K: Hash + Eq, T: Versioned>(
    map: &mut HashMap<K, T>,
    key: K,
    label: String,
    doc: &T,
) -> Result<u64> {
    let stored = map.get_mut(&key).ok_or_else(|| Error::NotFound(label.clone()))?;
    if stored.version() != doc.version() {
        return Err(Error::Conflict {
            key: label,
            expected: doc.version(),
            actual: stored.version(),
        });
    }
    let next = doc.version() + 1;
    *stored = doc.clone();
    stored.set_version(next);
    Ok(next)
}

#[derive(Default)]
struct Tables {
    progress: HashMap<LearnerId, ProgressAggregate>,
    accounts: HashMap<LearnerId, Account>,
    activity: HashMap<(LearnerId, NaiveDate), DailyActivity>,
    completions: Vec<LessonCompletion>,
    completion_ids: HashMap<CompletionId, usize>,
    badges: Vec<Badge>,
}

/// In-memory progress store.
pub struct MemoryProgressStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    /// Remaining successful writes; negative means unlimited.
    write_budget: AtomicI64,
    forced_conflicts: AtomicU32,
}

impl MemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            unavailable: AtomicBool::new(false),
            write_budget: AtomicI64::new(-1),
            forced_conflicts: AtomicU32::new(0),
        }
    }

    /// Make every call fail with [`Error::Unavailable`] until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Allow `writes` more successful writes, then fail the rest.
    /// `None` lifts the limit.
    pub fn set_write_budget(&self, writes: Option<u32>) {
        let budget = writes.map_or(-1, i64::from);
        self.write_budget.store(budget, Ordering::SeqCst);
    }

    /// Fail the next `count` replaces with a version conflict.
    pub fn force_conflicts(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.check_read()?;
        let spent = self
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                b if b < 0 => Some(b),
                0 => None,
                b => Some(b - 1),
            });
        if spent.is_err() {
            return Err(Error::Unavailable("memory store write budget exhausted".into()));
        }
        Ok(())
    }

    fn check_replace(&self, key: &str, expected: u64) -> Result<()> {
        self.check_write()?;
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if forced.is_ok() {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
                actual: expected + 1,
            });
        }
        Ok(())
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get_progress(&self, learner_id: &LearnerId) -> Result<Option<ProgressAggregate>> {
        self.check_read()?;
        Ok(self.tables.read().await.progress.get(learner_id).cloned())
    }

    async fn insert_progress(&self, progress: &ProgressAggregate) -> Result<bool> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        Ok(insert_absent(
            &mut tables.progress,
            progress.learner_id().clone(),
            progress,
        ))
    }

    async fn replace_progress(&self, progress: &ProgressAggregate) -> Result<u64> {
        let key = progress_key(progress.learner_id());
        self.check_replace(&key, progress.version())?;
        let mut tables = self.tables.write().await;
        replace_versioned(
            &mut tables.progress,
            progress.learner_id().clone(),
            key,
            progress,
        )
    }

    async fn list_progress(&self) -> Result<Vec<ProgressAggregate>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let mut all: Vec<_> = tables.progress.values().cloned().collect();
        all.sort_by(|a, b| a.learner_id().cmp(b.learner_id()));
        Ok(all)
    }

    async fn get_account(&self, learner_id: &LearnerId) -> Result<Option<Account>> {
        self.check_read()?;
        Ok(self.tables.read().await.accounts.get(learner_id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<bool> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        Ok(insert_absent(
            &mut tables.accounts,
            account.learner_id().clone(),
            account,
        ))
    }

    async fn replace_account(&self, account: &Account) -> Result<u64> {
        let key = account_key(account.learner_id());
        self.check_replace(&key, account.version())?;
        let mut tables = self.tables.write().await;
        replace_versioned(
            &mut tables.accounts,
            account.learner_id().clone(),
            key,
            account,
        )
    }

    async fn get_activity(
        &self,
        learner_id: &LearnerId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables.activity.get(&(learner_id.clone(), date)).cloned())
    }

    async fn insert_activity(&self, activity: &DailyActivity) -> Result<bool> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let key = (activity.learner_id().clone(), activity.date());
        Ok(insert_absent(&mut tables.activity, key, activity))
    }

    async fn replace_activity(&self, activity: &DailyActivity) -> Result<u64> {
        let label = activity_key(activity.learner_id(), activity.date());
        self.check_replace(&label, activity.version())?;
        let mut tables = self.tables.write().await;
        let key = (activity.learner_id().clone(), activity.date());
        replace_versioned(&mut tables.activity, key, label, activity)
    }

    async fn list_activity(&self, learner_id: &LearnerId) -> Result<Vec<DailyActivity>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let mut days: Vec<_> = tables
            .activity
            .values()
            .filter(|a| a.learner_id() == learner_id)
            .cloned()
            .collect();
        days.sort_by_key(DailyActivity::date);
        Ok(days)
    }

    async fn insert_completion(&self, completion: &LessonCompletion) -> Result<bool> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        if tables.completion_ids.contains_key(&completion.completion_id) {
            return Ok(false);
        }
        let index = tables.completions.len();
        tables.completions.push(completion.clone());
        tables.completion_ids.insert(completion.completion_id, index);
        Ok(true)
    }

    async fn list_completions(&self, learner_id: &LearnerId) -> Result<Vec<LessonCompletion>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let mut records: Vec<_> = tables
            .completions
            .iter()
            .filter(|c| &c.learner_id == learner_id)
            .cloned()
            .collect();
        records.sort_by_key(|c| c.completed_at);
        Ok(records)
    }

    async fn insert_badge(&self, badge: &Badge) -> Result<()> {
        self.check_write()?;
        self.tables.write().await.badges.push(badge.clone());
        Ok(())
    }

    async fn list_badges(&self, learner_id: &LearnerId) -> Result<Vec<Badge>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let mut badges: Vec<_> = tables
            .badges
            .iter()
            .filter(|b| &b.learner_id == learner_id)
            .cloned()
            .collect();
        badges.sort_by_key(|b| b.earned_at);
        Ok(badges)
    }
}
