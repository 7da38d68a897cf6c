//! CLI for driving the database upgrade engine
//!
//! Each command prints the resulting status payload as one JSON
//! document, so the output can be piped or parsed by tooling.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redirect_core::config::Config;
use redirect_core::database::{runner, SqlStageExecutor, StatusReport, UpgradeStatus};
use redirect_core::kernel::PostgresSettings;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "db_cli")]
#[command(about = "Database upgrade CLI for the redirection plugin")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current upgrade status
    Status,

    /// Start an install or upgrade run
    Start,

    /// Execute one stage of the in-flight run
    Step,

    /// Run all remaining stages until finished or a stage fails
    Run,

    /// Abort the in-flight run
    Stop,
}

fn output(report: &StatusReport) -> Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let settings = PostgresSettings::new(pool.clone());

    let report = match cli.command {
        Commands::Status => {
            let status = UpgradeStatus::new(&settings);
            status.get_json(None).await?
        }
        Commands::Start => runner::start_run(&settings).await?,
        Commands::Step => {
            let executor = SqlStageExecutor::new(pool.clone());
            runner::run_next_stage(&settings, &executor).await?
        }
        Commands::Run => {
            let executor = SqlStageExecutor::new(pool.clone());
            runner::run_to_completion(&settings, &executor).await?
        }
        Commands::Stop => {
            let mut status = UpgradeStatus::new(&settings);
            status.stop_update().await?;
            status.get_json(None).await?
        }
    };

    output(&report)
}
