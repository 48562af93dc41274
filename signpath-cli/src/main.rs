use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

use config::{ConfigLoader, StoreConfig};
use signpath_core::ProgressService;

#[derive(Parser)]
#[command(name = "signpath", about = "Inspect and update learner progress")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Local progress database (overrides [store])
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Lesson catalog file (overrides [catalog])
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a learner account
    Register(commands::learner::RegisterArgs),
    /// Show or list progress aggregates
    Progress(commands::progress::ProgressArgs),
    /// Record an attempt at a level
    Attempt(commands::progress::AttemptArgs),
    /// Record an attempt and complete the level on success
    CompleteLevel(commands::progress::AttemptArgs),
    /// Record a finished lesson
    CompleteLesson(commands::lessons::CompleteLessonArgs),
    /// Grant experience points
    GrantXp(commands::learner::GrantXpArgs),
    /// Show profile statistics
    Stats(commands::learner::LearnerArgs),
    /// Show account, statistics, badges and recent lessons
    Profile(commands::learner::LearnerArgs),
    /// Show lesson or daily activity history
    History(commands::lessons::HistoryArgs),
    /// Apply the daily streak transition
    Streak(commands::learner::StreakArgs),
    /// Browse the lesson catalog
    Catalog(commands::catalog::CatalogArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConfigLoader::load()?;
    if let Some(path) = cli.database {
        config.store = StoreConfig::Local { path };
    }
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
    }

    match cli.command {
        // Browsing the catalog needs no database.
        Commands::Catalog(args) => {
            let catalog = commands::load_catalog(&config)?;
            commands::catalog::run(&catalog, args)
        }
        command => {
            let service = commands::open_service(&config).await?;
            dispatch(&service, command).await
        }
    }
}

async fn dispatch(service: &ProgressService, command: Commands) -> Result<()> {
    match command {
        Commands::Register(args) => commands::learner::register(service, args).await,
        Commands::Progress(args) => commands::progress::run(service, args).await,
        Commands::Attempt(args) => commands::progress::attempt(service, args).await,
        Commands::CompleteLevel(args) => commands::progress::complete_level(service, args).await,
        Commands::CompleteLesson(args) => commands::lessons::complete_lesson(service, args).await,
        Commands::GrantXp(args) => commands::learner::grant_xp(service, args).await,
        Commands::Stats(args) => commands::learner::stats(service, args).await,
        Commands::Profile(args) => commands::learner::profile(service, args).await,
        Commands::History(args) => commands::lessons::history(service, args).await,
        Commands::Streak(args) => commands::learner::streak(service, args).await,
        Commands::Catalog(args) => commands::catalog::run(service.catalog(), args),
    }
}
