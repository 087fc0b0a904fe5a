use std::str::FromStr;

use chess_db::models::DbAccount;
use chess_db::pool::ConnectionPool;
use chess_db::types::Platform;
use chrono::NaiveDateTime;
use rocket::serde::Deserialize;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};

use super::blocking::query;
use super::error::ApiError;

/// Minimal account CRUD. The three import entry points all take an existing
/// account, so something has to create one. No authentication or ownership
/// model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountView {
    pub id: i64,
    pub platform: String,
    pub username: String,
    pub label: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_sync_at: Option<NaiveDateTime>,
}

impl From<DbAccount> for AccountView {
    fn from(a: DbAccount) -> Self {
        Self {
            id: a.id,
            platform: a.platform,
            username: a.username,
            label: a.label,
            created_at: a.created_at,
            last_sync_at: a.last_sync_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CreateAccountRequest {
    pub platform: String,
    pub username: String,
    pub label: Option<String>,
}

#[post("/accounts", data = "<body>")]
pub async fn create_account(
    pool: &State<ConnectionPool>,
    body: Json<CreateAccountRequest>,
) -> Result<Json<AccountView>, ApiError> {
    Platform::from_str(&body.platform).map_err(|_| ApiError::InvalidPlatform)?;

    let body = body.into_inner();
    let account = query(pool, move |conn| {
        chess_db::db::create_account(conn, &body.platform, &body.username, body.label.as_deref())
    })
    .await?;

    Ok(Json(account.into()))
}

#[get("/accounts/<account_id>")]
pub async fn get_account(
    pool: &State<ConnectionPool>,
    account_id: i64,
) -> Result<Json<AccountView>, ApiError> {
    let account = query(pool, move |conn| chess_db::db::get_account(conn, account_id)).await?;
    let account = account.ok_or(ApiError::AccountNotFound(account_id))?;
    Ok(Json(account.into()))
}

#[get("/accounts")]
pub async fn list_accounts(pool: &State<ConnectionPool>) -> Result<Json<Vec<AccountView>>, ApiError> {
    let accounts = query(pool, chess_db::db::list_accounts).await?;
    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}

#[delete("/accounts/<account_id>")]
pub async fn delete_account(
    pool: &State<ConnectionPool>,
    account_id: i64,
) -> Result<rocket::http::Status, ApiError> {
    let rows = query(pool, move |conn| {
        chess_db::db::delete_account_cascade(conn, account_id)
    })
    .await?;

    if rows == 0 {
        return Err(ApiError::AccountNotFound(account_id));
    }
    Ok(rocket::http::Status::NoContent)
}
