use chrono::Utc;
use diesel::dsl::exists as sql_exists;
use diesel::prelude::*;

use super::QueryError;
use crate::models::{DbJob, NewJob};
use crate::schema::jobs::dsl;

pub fn create(conn: &mut PgConnection, account_id: i64, file_name: Option<&str>) -> Result<DbJob, QueryError> {
    let new_job = NewJob {
        account_id,
        file_name,
        status: "PENDING",
        processed_games: 0,
        duplicate_games: 0,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(dsl::jobs)
        .values(&new_job)
        .get_result(conn)
        .map_err(QueryError::from)
}

pub fn get(conn: &mut PgConnection, job_id: i64) -> Result<Option<DbJob>, QueryError> {
    dsl::jobs
        .filter(dsl::id.eq(job_id))
        .first(conn)
        .optional()
        .map_err(QueryError::from)
}

pub fn set_status(conn: &mut PgConnection, job_id: i64, status: &str) -> Result<(), QueryError> {
    diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
        .set(dsl::status.eq(status))
        .execute(conn)
        .map_err(QueryError::from)?;
    Ok(())
}

/// A progress snapshot. Every field that is `Some` is written; `None` leaves
/// the column untouched, so callers only have to supply the counters that
/// actually changed since the last flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobCounters {
    pub total_games: Option<i32>,
    pub processed_games: Option<i32>,
    pub duplicate_games: Option<i32>,
    pub archives_processed: Option<i32>,
    pub total_archives: Option<i32>,
}

pub fn set_counters(conn: &mut PgConnection, job_id: i64, counters: JobCounters) -> Result<(), QueryError> {
    conn.transaction(|conn| {
        if let Some(total_games) = counters.total_games {
            diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
                .set(dsl::total_games.eq(total_games))
                .execute(conn)?;
        }
        if let Some(processed_games) = counters.processed_games {
            diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
                .set(dsl::processed_games.eq(processed_games))
                .execute(conn)?;
        }
        if let Some(duplicate_games) = counters.duplicate_games {
            diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
                .set(dsl::duplicate_games.eq(duplicate_games))
                .execute(conn)?;
        }
        if let Some(archives_processed) = counters.archives_processed {
            diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
                .set(dsl::archives_processed.eq(archives_processed))
                .execute(conn)?;
        }
        if let Some(total_archives) = counters.total_archives {
            diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
                .set(dsl::total_archives.eq(total_archives))
                .execute(conn)?;
        }
        Ok::<_, diesel::result::Error>(())
    })
    .map_err(QueryError::from)
}

pub fn mark_completed(conn: &mut PgConnection, job_id: i64) -> Result<(), QueryError> {
    diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
        .set((
            dsl::status.eq("COMPLETED"),
            dsl::completed_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .map_err(QueryError::from)?;
    Ok(())
}

pub fn mark_failed(conn: &mut PgConnection, job_id: i64, error_message: &str) -> Result<(), QueryError> {
    diesel::update(dsl::jobs.filter(dsl::id.eq(job_id)))
        .set((
            dsl::status.eq("FAILED"),
            dsl::completed_at.eq(Utc::now().naive_utc()),
            dsl::error_message.eq(error_message),
        ))
        .execute(conn)
        .map_err(QueryError::from)?;
    Ok(())
}

/// Deletes every Job row for an account. Used only by account deletion,
/// which must clear `jobs` before `games` can be dropped and the account
/// row itself removed (no `ON DELETE CASCADE` on the foreign keys).
pub fn delete_by_account(conn: &mut PgConnection, account_id: i64) -> Result<usize, QueryError> {
    diesel::delete(dsl::jobs.filter(dsl::account_id.eq(account_id)))
        .execute(conn)
        .map_err(QueryError::from)
}

pub fn exists_active(conn: &mut PgConnection, account_id: i64) -> Result<bool, QueryError> {
    diesel::select(sql_exists(
        dsl::jobs
            .filter(dsl::account_id.eq(account_id))
            .filter(dsl::status.eq_any(["PENDING", "PROCESSING"])),
    ))
    .get_result(conn)
    .map_err(QueryError::from)
}
