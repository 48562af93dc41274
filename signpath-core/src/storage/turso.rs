//! Turso/libSQL implementation of progress storage.
//!
//! Each mutable document is stored as JSON next to an integer `version`
//! column; the column is authoritative. It can connect to:
//! - Remote Turso database (cloud)
//! - Local embedded SQLite file
//! - An in-memory database (tests)

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use libsql::{Builder, Connection};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{account_key, activity_key, progress_key, Error, ProgressStore, Result};
use crate::account::Account;
use crate::activity::{Badge, DailyActivity, LessonCompletion};
use crate::progress::ProgressAggregate;
use crate::types::LearnerId;

const SCHEMA_PROGRESS: &str = r#"
CREATE TABLE IF NOT EXISTS progress (
    learner_id TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    document TEXT NOT NULL
)
"#;

const SCHEMA_ACCOUNTS: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    learner_id TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    document TEXT NOT NULL
)
"#;

const SCHEMA_DAILY_ACTIVITY: &str = r#"
CREATE TABLE IF NOT EXISTS daily_activity (
    learner_id TEXT NOT NULL,
    date TEXT NOT NULL,
    version INTEGER NOT NULL,
    document TEXT NOT NULL,
    PRIMARY KEY (learner_id, date)
)
"#;

const SCHEMA_LESSON_COMPLETIONS: &str = r#"
CREATE TABLE IF NOT EXISTS lesson_completions (
    completion_id TEXT PRIMARY KEY,
    learner_id TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    document TEXT NOT NULL
)
"#;

const INDEX_LESSON_COMPLETIONS: &str = r#"
CREATE INDEX IF NOT EXISTS idx_lesson_completions_learner_time
ON lesson_completions(learner_id, completed_at)
"#;

const SCHEMA_BADGES: &str = r#"
CREATE TABLE IF NOT EXISTS badges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    learner_id TEXT NOT NULL,
    earned_at TEXT NOT NULL,
    document TEXT NOT NULL
)
"#;

/// Turso-backed progress store.
///
/// Holds one connection for its whole lifetime so that an in-memory
/// database is shared by every call.
#[derive(Clone)]
pub struct TursoProgressStore {
    conn: Connection,
}

impl TursoProgressStore {
    /// Open (or create) a local embedded database file.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::from_connection(db.connect()?).await
    }

    /// Connect to a remote Turso database.
    pub async fn new_remote(url: &str, token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await?;
        Self::from_connection(db.connect()?).await
    }

    /// Create an in-memory database (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_connection(db.connect()?).await
    }

    async fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in [
            SCHEMA_PROGRESS,
            SCHEMA_ACCOUNTS,
            SCHEMA_DAILY_ACTIVITY,
            SCHEMA_LESSON_COMPLETIONS,
            INDEX_LESSON_COMPLETIONS,
            SCHEMA_BADGES,
        ] {
            self.conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// Decide why a conditional update touched no rows.
    async fn replace_miss(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        key: String,
        expected: u64,
    ) -> Error {
        let stored = match self.conn.query(sql, params).await {
            Ok(mut rows) => match rows.next().await {
                Ok(row) => row,
                Err(err) => return err.into(),
            },
            Err(err) => return err.into(),
        };
        match stored.map(|row| row.get::<i64>(0)) {
            None => Error::NotFound(key),
            Some(Ok(actual)) => Error::Conflict {
                key,
                expected,
                actual: to_version(actual),
            },
            Some(Err(err)) => err.into(),
        }
    }
}

fn to_version(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

fn from_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

/// Parse a `(version, document)` row.
fn parse_versioned<T: DeserializeOwned>(row: &libsql::Row) -> Result<(u64, T)> {
    let version: i64 = row.get(0)?;
    let document: String = row.get(1)?;
    Ok((to_version(version), serde_json::from_str(&document)?))
}

fn parse_document<T: DeserializeOwned>(row: &libsql::Row) -> Result<T> {
    let document: String = row.get(0)?;
    Ok(serde_json::from_str(&document)?)
}

fn parse_progress(row: &libsql::Row) -> Result<ProgressAggregate> {
    let (version, mut progress): (u64, ProgressAggregate) = parse_versioned(row)?;
    progress.set_version(version);
    Ok(progress)
}

fn parse_account(row: &libsql::Row) -> Result<Account> {
    let (version, mut account): (u64, Account) = parse_versioned(row)?;
    account.set_version(version);
    Ok(account)
}

fn parse_activity(row: &libsql::Row) -> Result<DailyActivity> {
    let (version, mut activity): (u64, DailyActivity) = parse_versioned(row)?;
    activity.set_version(version);
    Ok(activity)
}

#[async_trait]
impl ProgressStore for TursoProgressStore {
    #[instrument(skip(self), level = "debug")]
    async fn get_progress(&self, learner_id: &LearnerId) -> Result<Option<ProgressAggregate>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, document FROM progress WHERE learner_id = ?",
                [learner_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_progress(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, progress), fields(learner_id = %progress.learner_id()), level = "debug")]
    async fn insert_progress(&self, progress: &ProgressAggregate) -> Result<bool> {
        let document = serde_json::to_string(progress)?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO progress (learner_id, version, document) VALUES (?, ?, ?) ON CONFLICT(learner_id) DO NOTHING",
                libsql::params![
                    progress.learner_id().as_str(),
                    from_version(progress.version()),
                    document
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    #[instrument(skip(self, progress), fields(learner_id = %progress.learner_id(), version = progress.version()), level = "debug")]
    async fn replace_progress(&self, progress: &ProgressAggregate) -> Result<u64> {
        let next = progress.version() + 1;
        let document = serde_json::to_string(progress)?;
        let changed = self
            .conn
            .execute(
                "UPDATE progress SET version = ?, document = ? WHERE learner_id = ? AND version = ?",
                libsql::params![
                    from_version(next),
                    document,
                    progress.learner_id().as_str(),
                    from_version(progress.version())
                ],
            )
            .await?;
        if changed == 0 {
            debug!("conditional replace matched no row");
            return Err(self
                .replace_miss(
                    "SELECT version FROM progress WHERE learner_id = ?",
                    [progress.learner_id().as_str()],
                    progress_key(progress.learner_id()),
                    progress.version(),
                )
                .await);
        }
        Ok(next)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_progress(&self) -> Result<Vec<ProgressAggregate>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, document FROM progress ORDER BY learner_id ASC",
                (),
            )
            .await?;

        let mut all = Vec::new();
        while let Some(row) = rows.next().await? {
            all.push(parse_progress(&row)?);
        }
        Ok(all)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_account(&self, learner_id: &LearnerId) -> Result<Option<Account>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, document FROM accounts WHERE learner_id = ?",
                [learner_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_account(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, account), fields(learner_id = %account.learner_id()), level = "debug")]
    async fn insert_account(&self, account: &Account) -> Result<bool> {
        let document = serde_json::to_string(account)?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO accounts (learner_id, version, document) VALUES (?, ?, ?) ON CONFLICT(learner_id) DO NOTHING",
                libsql::params![
                    account.learner_id().as_str(),
                    from_version(account.version()),
                    document
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    #[instrument(skip(self, account), fields(learner_id = %account.learner_id(), version = account.version()), level = "debug")]
    async fn replace_account(&self, account: &Account) -> Result<u64> {
        let next = account.version() + 1;
        let document = serde_json::to_string(account)?;
        let changed = self
            .conn
            .execute(
                "UPDATE accounts SET version = ?, document = ? WHERE learner_id = ? AND version = ?",
                libsql::params![
                    from_version(next),
                    document,
                    account.learner_id().as_str(),
                    from_version(account.version())
                ],
            )
            .await?;
        if changed == 0 {
            return Err(self
                .replace_miss(
                    "SELECT version FROM accounts WHERE learner_id = ?",
                    [account.learner_id().as_str()],
                    account_key(account.learner_id()),
                    account.version(),
                )
                .await);
        }
        Ok(next)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_activity(
        &self,
        learner_id: &LearnerId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, document FROM daily_activity WHERE learner_id = ? AND date = ?",
                libsql::params![learner_id.as_str(), date.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_activity(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, activity), fields(learner_id = %activity.learner_id(), date = %activity.date()), level = "debug")]
    async fn insert_activity(&self, activity: &DailyActivity) -> Result<bool> {
        let document = serde_json::to_string(activity)?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO daily_activity (learner_id, date, version, document) VALUES (?, ?, ?, ?) ON CONFLICT(learner_id, date) DO NOTHING",
                libsql::params![
                    activity.learner_id().as_str(),
                    activity.date().to_string(),
                    from_version(activity.version()),
                    document
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    #[instrument(skip(self, activity), fields(learner_id = %activity.learner_id(), date = %activity.date()), level = "debug")]
    async fn replace_activity(&self, activity: &DailyActivity) -> Result<u64> {
        let next = activity.version() + 1;
        let document = serde_json::to_string(activity)?;
        let date = activity.date().to_string();
        let changed = self
            .conn
            .execute(
                "UPDATE daily_activity SET version = ?, document = ? WHERE learner_id = ? AND date = ? AND version = ?",
                libsql::params![
                    from_version(next),
                    document,
                    activity.learner_id().as_str(),
                    date.clone(),
                    from_version(activity.version())
                ],
            )
            .await?;
        if changed == 0 {
            return Err(self
                .replace_miss(
                    "SELECT version FROM daily_activity WHERE learner_id = ? AND date = ?",
                    libsql::params![activity.learner_id().as_str(), date],
                    activity_key(activity.learner_id(), activity.date()),
                    activity.version(),
                )
                .await);
        }
        Ok(next)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_activity(&self, learner_id: &LearnerId) -> Result<Vec<DailyActivity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, document FROM daily_activity WHERE learner_id = ? ORDER BY date ASC",
                [learner_id.as_str()],
            )
            .await?;

        let mut days = Vec::new();
        while let Some(row) = rows.next().await? {
            days.push(parse_activity(&row)?);
        }
        Ok(days)
    }

    #[instrument(skip(self, completion), fields(completion_id = %completion.completion_id), level = "debug")]
    async fn insert_completion(&self, completion: &LessonCompletion) -> Result<bool> {
        let document = serde_json::to_string(completion)?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO lesson_completions (completion_id, learner_id, completed_at, document) VALUES (?, ?, ?, ?) ON CONFLICT(completion_id) DO NOTHING",
                libsql::params![
                    completion.completion_id.to_string(),
                    completion.learner_id.as_str(),
                    completion.completed_at.to_rfc3339(),
                    document
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_completions(&self, learner_id: &LearnerId) -> Result<Vec<LessonCompletion>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document FROM lesson_completions WHERE learner_id = ? ORDER BY completed_at ASC",
                [learner_id.as_str()],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(parse_document(&row)?);
        }
        Ok(records)
    }

    #[instrument(skip(self, badge), fields(learner_id = %badge.learner_id), level = "debug")]
    async fn insert_badge(&self, badge: &Badge) -> Result<()> {
        let document = serde_json::to_string(badge)?;
        self.conn
            .execute(
                "INSERT INTO badges (learner_id, earned_at, document) VALUES (?, ?, ?)",
                libsql::params![
                    badge.learner_id.as_str(),
                    badge.earned_at.to_rfc3339(),
                    document
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_badges(&self, learner_id: &LearnerId) -> Result<Vec<Badge>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document FROM badges WHERE learner_id = ? ORDER BY earned_at ASC, id ASC",
                [learner_id.as_str()],
            )
            .await?;

        let mut badges = Vec::new();
        while let Some(row) = rows.next().await? {
            badges.push(parse_document(&row)?);
        }
        Ok(badges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttemptOutcome, CompletionId};
    use crate::progress::Attempt;
    use chrono::{TimeZone, Utc};

    async fn create_test_store() -> TursoProgressStore {
        TursoProgressStore::new_memory().await.unwrap()
    }

    fn learner() -> LearnerId {
        LearnerId::new("u1")
    }

    #[tokio::test]
    async fn store_returns_none_for_unknown_learner() {
        let store = create_test_store().await;

        assert!(store.get_progress(&learner()).await.unwrap().is_none());
        assert!(store.get_account(&learner()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_round_trips_through_replace() {
        let store = create_test_store().await;
        let mut progress = store.get_or_create_progress(&learner()).await.unwrap();
        progress.complete_level(
            Attempt::new(0, AttemptOutcome::Success, Utc::now()),
            4,
        );

        let version = store.replace_progress(&progress).await.unwrap();

        let stored = store.get_progress(&learner()).await.unwrap().unwrap();
        assert_eq!(version, 1);
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.completed_levels(), &[0]);
        assert_eq!(stored.current_level(), 1);
        assert_eq!(stored.stats().total_minutes_practiced, 4);
    }

    #[tokio::test]
    async fn stale_replace_reports_conflict() {
        let store = create_test_store().await;
        let progress = store.get_or_create_progress(&learner()).await.unwrap();
        store.replace_progress(&progress).await.unwrap();

        let err = store.replace_progress(&progress).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Conflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn replace_of_missing_document_is_not_found() {
        let store = create_test_store().await;

        let err = store
            .replace_account(&Account::new(learner(), 5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(ref key) if key == "accounts/u1"));
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_first_document() {
        let store = create_test_store().await;
        let account = Account::new(learner(), 5);

        assert!(store.insert_account(&account).await.unwrap());
        assert!(!store.insert_account(&Account::new(learner(), 9)).await.unwrap());

        let stored = store.get_account(&learner()).await.unwrap().unwrap();
        assert_eq!(stored.daily_goal(), 5);
    }

    #[tokio::test]
    async fn activity_is_keyed_by_learner_and_date() {
        let store = create_test_store().await;
        let day1 = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();

        let mut first = store.get_or_create_activity(&learner(), day2).await.unwrap();
        store.get_or_create_activity(&learner(), day1).await.unwrap();
        first.apply_completion(CompletionId::new(), 10, 5, 5);
        store.replace_activity(&first).await.unwrap();

        let days = store.list_activity(&learner()).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date(), day1);
        assert_eq!(days[1].lessons_completed(), 1);
        assert_eq!(days[1].version(), 1);
    }

    #[tokio::test]
    async fn completions_and_badges_list_oldest_first() {
        let store = create_test_store().await;
        for hour in [12, 9] {
            let record = LessonCompletion {
                completion_id: CompletionId::new(),
                learner_id: learner(),
                lesson_id: hour,
                category: "alphabet".into(),
                score: 80,
                total_possible_points: 100,
                minutes_spent: 5,
                is_perfect: false,
                completed_at: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            };
            assert!(store.insert_completion(&record).await.unwrap());
            assert!(!store.insert_completion(&record).await.unwrap());
        }
        store
            .insert_badge(&Badge {
                learner_id: learner(),
                title: "First steps".into(),
                icon: "star".into(),
                reason: "Completed a lesson".into(),
                earned_at: Utc::now(),
            })
            .await
            .unwrap();

        let records = store.list_completions(&learner()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lesson_id, 9);
        assert_eq!(store.list_badges(&learner()).await.unwrap().len(), 1);
        assert!(store.list_badges(&LearnerId::new("u2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");

        {
            let store = TursoProgressStore::new_local(&path).await.unwrap();
            store.insert_account(&Account::new(learner(), 3)).await.unwrap();
        }

        let store = TursoProgressStore::new_local(&path).await.unwrap();
        let account = store.get_account(&learner()).await.unwrap().unwrap();
        assert_eq!(account.daily_goal(), 3);
    }
}
