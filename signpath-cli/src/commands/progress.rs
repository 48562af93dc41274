//! Progress aggregate commands: show, list, attempt, complete-level.

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use signpath_core::compat::{LegacyProgress, RecordAttemptRequest};
use signpath_core::{LearnerId, ProgressAggregate, ProgressService};

/// Progress arguments.
#[derive(Args, Debug)]
pub struct ProgressArgs {
    #[command(subcommand)]
    pub command: ProgressCommands,
}

/// Progress subcommands.
#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Show one learner's progress (created on first access)
    Show {
        learner: String,

        /// Print in the legacy document layout
        #[arg(long)]
        legacy: bool,
    },
    /// List every learner's progress
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Arguments shared by `attempt` and `complete-level`.
#[derive(Args, Debug)]
pub struct AttemptArgs {
    pub learner: String,

    #[arg(allow_hyphen_values = true)]
    pub level: i64,

    /// success / failure (exito / fallo also accepted)
    pub outcome: String,

    /// RFC 3339 timestamp or YYYY-MM-DD; defaults to now
    #[arg(long)]
    pub at: Option<String>,

    /// Practice minutes to add
    #[arg(long, default_value_t = 0)]
    pub minutes: u32,
}

impl AttemptArgs {
    fn into_request(self) -> RecordAttemptRequest {
        RecordAttemptRequest {
            learner_id: self.learner,
            level: self.level,
            outcome: self.outcome,
            timestamp: self.at,
            minutes_practiced: self.minutes,
        }
    }
}

/// Run progress command.
pub async fn run(service: &ProgressService, args: ProgressArgs) -> Result<()> {
    match args.command {
        ProgressCommands::Show { learner, legacy } => show(service, &learner, legacy).await,
        ProgressCommands::List { json } => list(service, json).await,
    }
}

async fn show(service: &ProgressService, learner: &str, legacy: bool) -> Result<()> {
    let progress = service.get_progress(&LearnerId::new(learner)).await?;
    if legacy {
        super::print_json(&LegacyProgress::from(&progress))
    } else {
        super::print_json(&progress)
    }
}

async fn list(service: &ProgressService, json: bool) -> Result<()> {
    let all = service.get_all_progress().await?;
    if json {
        return super::print_json(&all);
    }
    if all.is_empty() {
        println!("No progress recorded yet.");
        return Ok(());
    }
    println!("{}", progress_table(&all));
    Ok(())
}

fn progress_table(all: &[ProgressAggregate]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Learner").fg(Color::Cyan),
        Cell::new("Current level").fg(Color::Cyan),
        Cell::new("Completed").fg(Color::Cyan),
        Cell::new("Attempts").fg(Color::Cyan),
        Cell::new("Successes").fg(Color::Cyan),
        Cell::new("Minutes").fg(Color::Cyan),
    ]);

    for progress in all {
        let stats = progress.stats();
        table.add_row(vec![
            Cell::new(progress.learner_id()),
            Cell::new(progress.current_level()),
            Cell::new(progress.completed_levels().len()),
            Cell::new(stats.total_attempts),
            Cell::new(stats.total_successes),
            Cell::new(stats.total_minutes_practiced),
        ]);
    }
    table
}

/// Run attempt command.
pub async fn attempt(service: &ProgressService, args: AttemptArgs) -> Result<()> {
    let command = args.into_request().into_command()?;
    let progress = service.record_attempt(command).await?;
    super::print_json(&progress)
}

/// Run complete-level command.
pub async fn complete_level(service: &ProgressService, args: AttemptArgs) -> Result<()> {
    let command = args.into_request().into_command()?;
    let progress = service.complete_level(command).await?;
    super::print_json(&progress)
}
