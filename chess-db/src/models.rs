use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{accounts, games, jobs};

#[derive(Debug, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount<'a> {
    pub platform: &'a str,
    pub username: &'a str,
    pub label: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbAccount {
    pub id: i64,
    pub platform: String,
    pub username: String,
    pub label: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_sync_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob<'a> {
    pub account_id: i64,
    pub file_name: Option<&'a str>,
    pub status: &'a str,
    pub processed_games: i32,
    pub duplicate_games: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Associations, Serialize)]
#[diesel(belongs_to(DbAccount, foreign_key = account_id))]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbJob {
    pub id: i64,
    pub account_id: i64,
    pub file_name: Option<String>,
    pub status: String,
    pub total_games: Option<i32>,
    pub processed_games: i32,
    pub duplicate_games: i32,
    pub archives_processed: Option<i32>,
    pub total_archives: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = games)]
pub struct NewGame<'a> {
    pub account_id: i64,
    pub played_at: NaiveDateTime,
    pub result: &'a str,
    pub color: &'a str,
    pub time_control_raw: Option<&'a str>,
    pub time_control_category: &'a str,
    pub eco_code: Option<&'a str>,
    pub opening_name: Option<&'a str>,
    pub opponent: Option<&'a str>,
    pub pgn_hash: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Associations, Serialize)]
#[diesel(belongs_to(DbAccount, foreign_key = account_id))]
#[diesel(table_name = games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DbGame {
    pub id: i64,
    pub account_id: i64,
    pub played_at: NaiveDateTime,
    pub result: String,
    pub color: String,
    pub time_control_raw: Option<String>,
    pub time_control_category: String,
    pub eco_code: Option<String>,
    pub opening_name: Option<String>,
    pub opponent: Option<String>,
    pub pgn_hash: String,
    pub created_at: NaiveDateTime,
}
