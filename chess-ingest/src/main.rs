//! Command-line driver for a single ingestion job, grounded on the
//! teacher's `mmoldb-ingest` binary: `env_logger` for logging, `miette`
//! for top-level diagnostics, and a thin `tokio::main` entry point that
//! hands off to the same `Coordinator` the HTTP layer uses.
//!
//! Unlike the HTTP layer, this binary blocks until the job it enqueues
//! reaches a terminal state, polling the Job Store the same way any other
//! poller would.

use std::path::PathBuf;
use std::time::Duration;

use chess_db::models::DbJob;
use chess_db::pool::ConnectionPool;
use chess_ingest::{Coordinator, IngestConfig};
use clap::{Parser, Subcommand};
use log::info;
use miette::IntoDiagnostic;

#[derive(Debug, Parser)]
#[command(name = "chess-ingest", about = "Drive one game import from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a local PGN file for an existing account.
    File {
        account_id: i64,
        path: PathBuf,
    },
    /// Import from Chess.com's public games API for an existing account.
    Chesscom { account_id: i64 },
    /// Import from Lichess' streaming games API for an existing account.
    Lichess { account_id: i64 },
}

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> miette::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let pool: ConnectionPool = chess_db::pool::get_pool(4).into_diagnostic()?;
    let config = IngestConfig::load().into_diagnostic()?;
    let coordinator = Coordinator::new(pool, config);

    let job = match cli.command {
        Command::File { account_id, path } => {
            let original_name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.pgn".to_string());
            coordinator
                .enqueue_file_import(account_id, path, original_name)
                .await
        }
        Command::Chesscom { account_id } => coordinator.enqueue_chesscom_import(account_id).await,
        Command::Lichess { account_id } => coordinator.enqueue_lichess_import(account_id).await,
    }
    .into_diagnostic()?;

    info!("enqueued job {} for account {}", job.id, job.account_id);

    let final_job = wait_for_terminal_state(&coordinator, job).await?;
    info!(
        "job {} finished with status {}: {} processed, {} duplicates",
        final_job.id, final_job.status, final_job.processed_games, final_job.duplicate_games
    );
    if let Some(error_message) = &final_job.error_message {
        eprintln!("job {} failed: {error_message}", final_job.id);
        std::process::exit(1);
    }

    Ok(())
}

async fn wait_for_terminal_state(
    coordinator: &Coordinator,
    job: DbJob,
) -> miette::Result<DbJob> {
    let mut current = job;
    loop {
        if matches!(current.status.as_str(), "COMPLETED" | "FAILED") {
            return Ok(current);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
        current = coordinator
            .job_status(current.id)
            .into_diagnostic()?
            .expect("job row disappears only if the account is deleted mid-import");
    }
}
