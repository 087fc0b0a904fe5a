use chrono::{NaiveDateTime, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};

use super::QueryError;
use crate::models::{DbAccount, NewAccount};
use crate::schema::accounts::dsl;

/// Creates an account. `username` is stored verbatim; lookups compare it
/// case-insensitively, so callers don't need to normalize it themselves.
pub fn create_account(
    conn: &mut PgConnection,
    platform: &str,
    username: &str,
    label: Option<&str>,
) -> Result<DbAccount, QueryError> {
    let new_account = NewAccount {
        platform,
        username,
        label,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(dsl::accounts)
        .values(&new_account)
        .get_result(conn)
        .map_err(QueryError::from)
}

pub fn get_account(conn: &mut PgConnection, account_id: i64) -> Result<Option<DbAccount>, QueryError> {
    dsl::accounts
        .filter(dsl::id.eq(account_id))
        .first(conn)
        .optional()
        .map_err(QueryError::from)
}

/// `(platform, lower(username))` identifies an account per the uniqueness
/// invariant; this is the lookup the ingest coordinator uses to resolve a
/// provider username to a local account id.
pub fn find_by_platform_and_username(
    conn: &mut PgConnection,
    platform: &str,
    username: &str,
) -> Result<Option<DbAccount>, QueryError> {
    dsl::accounts
        .filter(dsl::platform.eq(platform))
        .filter(sql::<Bool>("lower(username) = lower(").bind::<Text, _>(username).sql(")"))
        .first(conn)
        .optional()
        .map_err(QueryError::from)
}

pub fn list_accounts(conn: &mut PgConnection) -> Result<Vec<DbAccount>, QueryError> {
    dsl::accounts
        .order(dsl::id.asc())
        .load(conn)
        .map_err(QueryError::from)
}

pub fn delete_account(conn: &mut PgConnection, account_id: i64) -> Result<usize, QueryError> {
    diesel::delete(dsl::accounts.filter(dsl::id.eq(account_id)))
        .execute(conn)
        .map_err(QueryError::from)
}

/// Deletes an account and everything that references it. `games` and
/// `jobs` have no `ON DELETE CASCADE`, so the children are cleared first;
/// the whole thing is one transaction so a crash mid-delete can't leave an
/// account with orphaned rows on one side or the other.
pub fn delete_account_cascade(conn: &mut PgConnection, account_id: i64) -> Result<usize, QueryError> {
    conn.transaction(|conn| {
        super::games::delete_by_account(conn, account_id)?;
        super::jobs::delete_by_account(conn, account_id)?;
        delete_account(conn, account_id)
    })
}

/// Advances `last_sync_at`. Per the invariant this only ever moves forward;
/// callers (the Coordinator, on a COMPLETED job) are expected to pass the
/// timestamp captured when the job entered `PROCESSING`, not the time it
/// finished — using the completion time would let games played during a
/// long-running job fall before the cursor and be skipped by the next
/// incremental sync.
pub fn set_last_sync_at(
    conn: &mut PgConnection,
    account_id: i64,
    at: NaiveDateTime,
) -> Result<(), QueryError> {
    diesel::update(dsl::accounts.filter(dsl::id.eq(account_id)))
        .set(dsl::last_sync_at.eq(at))
        .execute(conn)
        .map_err(QueryError::from)?;
    Ok(())
}
