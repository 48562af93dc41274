//! Lesson commands: complete-lesson and history.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use signpath_core::{CompleteLesson, CompletionId, LearnerId, ProgressService};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct CompleteLessonArgs {
    pub learner: String,

    pub lesson: u32,

    #[arg(allow_hyphen_values = true)]
    pub score: i64,

    /// Reuse to retry a completion without counting it twice
    #[arg(long)]
    pub completion_id: Option<Uuid>,

    /// RFC 3339 completion time; defaults to now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Minutes spent; defaults to the lesson's estimate
    #[arg(long)]
    pub minutes: Option<u32>,
}

impl CompleteLessonArgs {
    fn into_command(self) -> CompleteLesson {
        CompleteLesson {
            learner_id: LearnerId::new(self.learner),
            lesson_id: self.lesson,
            score: self.score,
            completion_id: self.completion_id.map(CompletionId),
            completed_at: self.at,
            minutes_spent: self.minutes,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum HistoryKind {
    /// Lesson completion records
    Lessons,
    /// Daily activity records
    Activity,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub learner: String,

    #[arg(long, value_enum, default_value_t = HistoryKind::Lessons)]
    pub kind: HistoryKind,

    /// Lessons: number of records. Activity: number of days.
    #[arg(long, default_value_t = 7)]
    pub limit: u32,

    /// Last day of the activity window (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

/// Run complete-lesson command.
pub async fn complete_lesson(service: &ProgressService, args: CompleteLessonArgs) -> Result<()> {
    let report = service.complete_lesson(args.into_command()).await?;
    super::print_json(&report)
}

/// Run history command.
pub async fn history(service: &ProgressService, args: HistoryArgs) -> Result<()> {
    let learner = LearnerId::new(args.learner);
    match args.kind {
        HistoryKind::Lessons => {
            let limit = usize::try_from(args.limit).unwrap_or(usize::MAX);
            let records = service.get_lesson_history(&learner, limit).await?;
            super::print_json(&records)
        }
        HistoryKind::Activity => {
            let until = args.until.unwrap_or_else(|| Utc::now().date_naive());
            let days = service
                .get_activity_history(&learner, args.limit, until)
                .await?;
            super::print_json(&days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_id_is_carried_into_the_command() {
        let id = Uuid::now_v7();
        let args = CompleteLessonArgs {
            learner: "u1".to_string(),
            lesson: 2,
            score: 80,
            completion_id: Some(id),
            at: None,
            minutes: Some(9),
        };

        let command = args.into_command();

        assert_eq!(command.completion_id, Some(CompletionId(id)));
        assert_eq!(command.lesson_id, 2);
        assert_eq!(command.minutes_spent, Some(9));
    }
}
