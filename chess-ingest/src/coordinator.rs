//! The Ingestion Coordinator: owns a running Job from `PENDING` through to
//! a terminal state and exposes the three public entry points the HTTP
//! layer calls.

use std::path::PathBuf;
use std::sync::Arc;

use chess_db::db;
use chess_db::models::{DbAccount, DbJob, NewGame};
use chess_db::pool::ConnectionPool;
use chess_db::types::Platform;
use chrono::{NaiveDateTime, Utc};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;
use crate::error::{EnqueueError, JobFailure};
use crate::pgn::ParsedGame;
use provider_fetch::{Fetcher, Provider};

#[derive(Clone)]
pub struct Coordinator {
    pool: ConnectionPool,
    config: Arc<IngestConfig>,
}

impl Coordinator {
    pub fn new(pool: ConnectionPool, config: IngestConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub async fn enqueue_file_import(
        &self,
        account_id: i64,
        stored_path: PathBuf,
        original_name: String,
    ) -> Result<DbJob, EnqueueError> {
        let job = {
            let mut conn = self.pool.get().expect("pool not poisoned");
            db::create(&mut conn, account_id, Some(&original_name))?
        };

        let this = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = this.run_file_job(job_id, account_id, stored_path).await {
                this.fail_job(job_id, &e.to_string());
            }
        });

        Ok(job)
    }

    pub async fn enqueue_chesscom_import(&self, account_id: i64) -> Result<DbJob, EnqueueError> {
        let account = self.require_account_for(account_id, Platform::ChessCom).await?;
        let job = self.create_job_for_account(account_id)?;

        let this = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = this.run_chesscom_job(job_id, account).await {
                this.fail_job(job_id, &e.to_string());
            }
        });

        Ok(job)
    }

    pub async fn enqueue_lichess_import(&self, account_id: i64) -> Result<DbJob, EnqueueError> {
        let account = self.require_account_for(account_id, Platform::Lichess).await?;
        let job = self.create_job_for_account(account_id)?;

        let this = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = this.run_lichess_job(job_id, account).await {
                this.fail_job(job_id, &e.to_string());
            }
        });

        Ok(job)
    }

    async fn require_account_for(
        &self,
        account_id: i64,
        expected: Platform,
    ) -> Result<DbAccount, EnqueueError> {
        let mut conn = self.pool.get().expect("pool not poisoned");
        let account = db::get_account(&mut conn, account_id)?
            .ok_or(EnqueueError::AccountNotFound { account_id })?;

        let actual: Platform = account
            .platform
            .parse()
            .unwrap_or(Platform::Other);
        if actual != expected {
            return Err(EnqueueError::WrongPlatform {
                account_id,
                platform: platform_name(expected),
            });
        }

        if db::exists_active(&mut conn, account_id)? {
            return Err(EnqueueError::ImportAlreadyActive { account_id });
        }

        Ok(account)
    }

    fn create_job_for_account(&self, account_id: i64) -> Result<DbJob, EnqueueError> {
        let mut conn = self.pool.get().expect("pool not poisoned");
        Ok(db::create(&mut conn, account_id, None)?)
    }

    async fn run_file_job(
        &self,
        job_id: i64,
        account_id: i64,
        stored_path: PathBuf,
    ) -> Result<(), JobFailure> {
        let started_at = self.begin_processing(job_id)?;

        let total = crate::sources::count_file_games(&stored_path)?;
        self.record_totals(job_id, Some(total as i32), None);

        let username = self.account_username(account_id)?;
        let mut counters = RunningCounters::default();
        let interval = self.config.file_progress_interval;

        crate::sources::run_file(&stored_path, &username, |game| {
            self.handle_game(account_id, game, &mut counters);
            if counters.processed % interval == 0 {
                self.flush_counters(job_id, &counters, None, None);
            }
        })
        .await?;

        self.finish_job(job_id, account_id, &counters, started_at);
        Ok(())
    }

    async fn run_chesscom_job(&self, job_id: i64, account: DbAccount) -> Result<(), JobFailure> {
        let started_at = self.begin_processing(job_id)?;

        let cancel = CancellationToken::new();
        let fetcher = Fetcher::new(Provider::ChessCom);

        let archives = crate::sources::run_chesscom_archives(
            &fetcher,
            &account.username,
            account.last_sync_at,
            &cancel,
        )
        .await?;
        self.record_totals(job_id, None, Some(archives.len() as i32));

        let mut counters = RunningCounters::default();
        let interval = self.config.api_progress_interval;
        let username = account.username.clone();
        let account_id = account.id;

        crate::sources::run_chesscom(
            &fetcher,
            &archives,
            &username,
            &cancel,
            |game| {
                self.handle_game(account_id, game, &mut counters);
                if counters.processed % interval == 0 {
                    self.flush_counters(job_id, &counters, None, None);
                }
            },
            |games_seen| {
                self.flush_archive_progress(job_id, games_seen as i32);
            },
        )
        .await?;

        self.finish_job(job_id, account_id, &counters, started_at);
        Ok(())
    }

    async fn run_lichess_job(&self, job_id: i64, account: DbAccount) -> Result<(), JobFailure> {
        let started_at = self.begin_processing(job_id)?;

        let cancel = CancellationToken::new();
        let fetcher = Fetcher::new(Provider::Lichess);
        let mut counters = RunningCounters::default();
        let interval = self.config.api_progress_interval;
        let account_id = account.id;
        let username = account.username.clone();
        let last_sync_at = account.last_sync_at;

        crate::sources::run_lichess(&fetcher, &username, last_sync_at, &cancel, |game| {
            self.handle_game(account_id, game, &mut counters);
            if counters.processed % interval == 0 {
                self.flush_counters(job_id, &counters, Some(counters.processed as i32), None);
            }
        })
        .await?;

        self.finish_job(job_id, account_id, &counters, started_at);
        Ok(())
    }

    /// Reads back a Job's current state. Exposed for pollers that don't go
    /// through the HTTP layer (e.g. the `chess-ingest` CLI binary).
    pub fn job_status(&self, job_id: i64) -> Result<Option<DbJob>, chess_db::QueryError> {
        let mut conn = self.pool.get().expect("pool not poisoned");
        db::get(&mut conn, job_id)
    }

    fn account_username(&self, account_id: i64) -> Result<String, JobFailure> {
        let mut conn = self.pool.get().expect("pool not poisoned");
        let account = db::get_account(&mut conn, account_id)?
            .expect("account existed when the job was enqueued");
        Ok(account.username)
    }

    /// Transitions the Job to `PROCESSING` and returns the moment it did so.
    /// Called before any fallible fetch/count so a failure there still
    /// leaves the Job in `PROCESSING`, not `PENDING`, when it's marked
    /// `FAILED`. The returned timestamp is what `finish_job` later advances
    /// `last_sync_at` to, since it — not the job's completion time — is the
    /// instant the incremental sync cursor should move to.
    fn begin_processing(&self, job_id: i64) -> Result<NaiveDateTime, JobFailure> {
        let mut conn = self.pool.get().expect("pool not poisoned");
        db::set_status(&mut conn, job_id, "PROCESSING")?;
        Ok(Utc::now().naive_utc())
    }

    /// Records a total once it's known (file game count, Chess.com archive
    /// count). Best-effort like the other progress flushes: a failure here
    /// only degrades the reported progress, it never fails the job.
    fn record_totals(&self, job_id: i64, total_games: Option<i32>, total_archives: Option<i32>) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to record totals for job {job_id}: {e}");
                return;
            }
        };
        let result = db::set_counters(
            &mut conn,
            job_id,
            db::JobCounters {
                total_games,
                total_archives,
                ..Default::default()
            },
        );
        if let Err(e) = result {
            warn!("failed to record totals for job {job_id}: {e}");
        }
    }

    /// Runs a blocking diesel operation from inside the async job task.
    /// Every per-game store call goes through here so the tokio reactor
    /// thread isn't starved while waiting on the database.
    fn handle_game(&self, account_id: i64, game: ParsedGame, counters: &mut RunningCounters) {
        tokio::task::block_in_place(|| self.handle_game_blocking(account_id, game, counters));
    }

    fn handle_game_blocking(&self, account_id: i64, game: ParsedGame, counters: &mut RunningCounters) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to record a game: {e}");
                return;
            }
        };

        let already_exists = db::exists(&mut conn, account_id, &game.pgn_hash).unwrap_or(false);
        if already_exists {
            counters.duplicates += 1;
            counters.processed += 1;
            return;
        }

        let new_game = NewGame {
            account_id,
            played_at: game.played_at,
            result: &game.result.to_string(),
            color: &game.color.to_string(),
            time_control_raw: game.time_control_raw.as_deref(),
            time_control_category: &game.time_control_category.to_string(),
            eco_code: game.eco_code.as_deref(),
            opening_name: game.opening_name.as_deref(),
            opponent: game.opponent.as_deref(),
            pgn_hash: &game.pgn_hash,
            created_at: Utc::now().naive_utc(),
        };

        match db::insert(&mut conn, &new_game) {
            Ok(Some(_)) => {}
            Ok(None) => counters.duplicates += 1,
            Err(e) => warn!("failed to insert game: {e}"),
        }
        counters.processed += 1;
    }

    fn flush_counters(
        &self,
        job_id: i64,
        counters: &RunningCounters,
        total_games_override: Option<i32>,
        total_archives: Option<i32>,
    ) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to flush job counters: {e}");
                return;
            }
        };
        let result = db::set_counters(
            &mut conn,
            job_id,
            db::JobCounters {
                processed_games: Some(counters.processed as i32),
                duplicate_games: Some(counters.duplicates as i32),
                total_games: total_games_override,
                total_archives,
                ..Default::default()
            },
        );
        if let Err(e) = result {
            warn!("failed to flush job counters: {e}");
        }
    }

    fn flush_archive_progress(&self, job_id: i64, total_games_so_far: i32) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to flush archive progress: {e}");
                return;
            }
        };
        let current = match db::get(&mut conn, job_id) {
            Ok(Some(job)) => job,
            _ => return,
        };
        let archives_processed = current.archives_processed.unwrap_or(0) + 1;
        let result = db::set_counters(
            &mut conn,
            job_id,
            db::JobCounters {
                archives_processed: Some(archives_processed),
                total_games: Some(total_games_so_far),
                ..Default::default()
            },
        );
        if let Err(e) = result {
            warn!("failed to flush archive progress: {e}");
        }
    }

    fn finish_job(
        &self,
        job_id: i64,
        account_id: i64,
        counters: &RunningCounters,
        started_at: NaiveDateTime,
    ) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to finish job {job_id}: {e}");
                return;
            }
        };
        let result = db::set_counters(
            &mut conn,
            job_id,
            db::JobCounters {
                processed_games: Some(counters.processed as i32),
                duplicate_games: Some(counters.duplicates as i32),
                ..Default::default()
            },
        );
        if let Err(e) = result {
            warn!("failed to flush final counters for job {job_id}: {e}");
        }
        if let Err(e) = db::mark_completed(&mut conn, job_id) {
            error!("failed to mark job {job_id} completed: {e}");
            return;
        }
        if let Err(e) = db::set_last_sync_at(&mut conn, account_id, started_at) {
            warn!("failed to advance last_sync_at for account {account_id}: {e}");
        }
        info!(
            "job {job_id} completed: {} processed, {} duplicates",
            counters.processed, counters.duplicates
        );
    }

    fn fail_job(&self, job_id: i64, message: &str) {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to get a connection to fail job {job_id}: {e}");
                return;
            }
        };
        if let Err(e) = db::mark_failed(&mut conn, job_id, message) {
            error!("failed to mark job {job_id} failed: {e}");
        }
    }
}

#[derive(Debug, Default)]
struct RunningCounters {
    processed: u64,
    duplicates: u64,
}

fn platform_name(platform: Platform) -> &'static str {
    match platform {
        Platform::ChessCom => "CHESS_COM",
        Platform::Lichess => "LICHESS",
        Platform::Other => "OTHER",
    }
}
