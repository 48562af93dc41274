//! Account-level commands: register, grant-xp, streak, stats, profile.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use signpath_core::{Account, LearnerId, ProgressService, StreakTransition};

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub learner: String,

    /// Lessons per day; defaults to progress.default_daily_goal
    #[arg(long)]
    pub daily_goal: Option<u32>,
}

#[derive(Args, Debug)]
pub struct GrantXpArgs {
    pub learner: String,

    #[arg(allow_hyphen_values = true)]
    pub points: i64,
}

#[derive(Args, Debug)]
pub struct StreakArgs {
    pub learner: String,

    /// Activity date (YYYY-MM-DD, UTC); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct LearnerArgs {
    pub learner: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreakUpdate {
    transition: StreakTransition,
    account: Account,
}

/// Run register command.
pub async fn register(service: &ProgressService, args: RegisterArgs) -> Result<()> {
    let account = service
        .register_account(&LearnerId::new(args.learner), args.daily_goal)
        .await?;
    super::print_json(&account)
}

/// Run grant-xp command.
pub async fn grant_xp(service: &ProgressService, args: GrantXpArgs) -> Result<()> {
    let account = service
        .grant_experience(&LearnerId::new(args.learner), args.points)
        .await?;
    super::print_json(&account)
}

/// Run streak command.
pub async fn streak(service: &ProgressService, args: StreakArgs) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let (account, transition) = service
        .update_streak(&LearnerId::new(args.learner), date)
        .await?;
    super::print_json(&StreakUpdate {
        transition,
        account,
    })
}

/// Run stats command.
pub async fn stats(service: &ProgressService, args: LearnerArgs) -> Result<()> {
    let summary = service.get_stats(&LearnerId::new(args.learner)).await?;
    super::print_json(&summary)
}

/// Run profile command.
pub async fn profile(service: &ProgressService, args: LearnerArgs) -> Result<()> {
    let profile = service.get_profile(&LearnerId::new(args.learner)).await?;
    super::print_json(&profile)
}
