use chess_db::pool::ConnectionPool;
use rocket::serde::json::Json;
use rocket::{State, get};

use super::blocking::query;
use super::error::ApiError;

/// One day's worth of games in an account's activity calendar.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DailyCount {
    pub date: chrono::NaiveDate,
    pub games: i64,
}

/// `GET /accounts/{id}/analytics/daily`: per-day game counts for an
/// account's activity calendar.
#[get("/accounts/<account_id>/analytics/daily")]
pub async fn daily(
    pool: &State<ConnectionPool>,
    account_id: i64,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let rows = query(pool, move |conn| chess_db::db::daily_counts(conn, account_id)).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(date, games)| DailyCount { date, games })
            .collect(),
    ))
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultCount {
    pub result: String,
    pub games: i64,
}

/// `GET /accounts/{id}/analytics/results?color=WHITE|BLACK`: win/loss/draw
/// breakdown, optionally narrowed to one color. `color` absent means no
/// filter.
#[get("/accounts/<account_id>/analytics/results?<color>")]
pub async fn results(
    pool: &State<ConnectionPool>,
    account_id: i64,
    color: Option<String>,
) -> Result<Json<Vec<ResultCount>>, ApiError> {
    let rows = query(pool, move |conn| {
        chess_db::db::result_breakdown(conn, account_id, color.as_deref())
    })
    .await?;
    Ok(Json(
        rows.into_iter()
            .map(|(result, games)| ResultCount { result, games })
            .collect(),
    ))
}
