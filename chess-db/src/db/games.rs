use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::QueryError;
use crate::models::{DbGame, NewGame};
use crate::schema::games::dsl;

pub fn exists(conn: &mut PgConnection, account_id: i64, pgn_hash: &str) -> Result<bool, QueryError> {
    use diesel::dsl::exists as sql_exists;

    diesel::select(sql_exists(
        dsl::games
            .filter(dsl::account_id.eq(account_id))
            .filter(dsl::pgn_hash.eq(pgn_hash)),
    ))
    .get_result(conn)
    .map_err(QueryError::from)
}

/// Inserts a game. Returns `Ok(None)` rather than an error when the
/// `(account_id, pgn_hash)` uniqueness constraint rejects the row — the
/// coordinator treats that as "duplicate", not failure.
pub fn insert<'a>(conn: &mut PgConnection, new_game: &NewGame<'a>) -> Result<Option<DbGame>, QueryError> {
    match diesel::insert_into(dsl::games)
        .values(new_game)
        .get_result(conn)
    {
        Ok(game) => Ok(Some(game)),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Ok(None),
        Err(other) => Err(QueryError::from(other)),
    }
}

pub fn count_by_account(conn: &mut PgConnection, account_id: i64) -> Result<i64, QueryError> {
    dsl::games
        .filter(dsl::account_id.eq(account_id))
        .count()
        .get_result(conn)
        .map_err(QueryError::from)
}

pub fn delete_by_account(conn: &mut PgConnection, account_id: i64) -> Result<usize, QueryError> {
    diesel::delete(dsl::games.filter(dsl::account_id.eq(account_id)))
        .execute(conn)
        .map_err(QueryError::from)
}

/// Per-day game counts for the account's activity calendar. Uses a raw
/// `date(played_at)` expression the same way `find_by_platform_and_username`
/// drops to raw SQL for `lower(username)` — Diesel has no portable
/// date-truncation function of its own.
pub fn daily_counts(
    conn: &mut PgConnection,
    account_id: i64,
) -> Result<Vec<(chrono::NaiveDate, i64)>, QueryError> {
    use diesel::sql_types::Date;

    dsl::games
        .filter(dsl::account_id.eq(account_id))
        .group_by(diesel::dsl::sql::<Date>("date(played_at)"))
        .select((
            diesel::dsl::sql::<Date>("date(played_at)"),
            diesel::dsl::count_star(),
        ))
        .order(diesel::dsl::sql::<Date>("date(played_at)").asc())
        .load(conn)
        .map_err(QueryError::from)
}

/// Win/loss/draw breakdown, optionally narrowed to one color. `color`
/// follows the `(:param IS NULL OR column = :param)` dynamic-filter idiom;
/// expressed as two concrete queries rather than a boxed one, since
/// `GROUP BY` after `.into_boxed()` isn't something Diesel's query builder
/// supports.
pub fn result_breakdown(
    conn: &mut PgConnection,
    account_id: i64,
    color: Option<&str>,
) -> Result<Vec<(String, i64)>, QueryError> {
    match color {
        Some(color) => dsl::games
            .filter(dsl::account_id.eq(account_id))
            .filter(dsl::color.eq(color.to_string()))
            .group_by(dsl::result)
            .select((dsl::result, diesel::dsl::count_star()))
            .load(conn)
            .map_err(QueryError::from),
        None => dsl::games
            .filter(dsl::account_id.eq(account_id))
            .group_by(dsl::result)
            .select((dsl::result, diesel::dsl::count_star()))
            .load(conn)
            .map_err(QueryError::from),
    }
}
