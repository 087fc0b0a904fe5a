use chess_db::models::DbJob;
use chess_db::pool::ConnectionPool;
use chess_ingest::{Coordinator, IngestConfig};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use uuid::Uuid;

use super::blocking::query;
use super::error::ApiError;

/// The Job JSON shape returned to API callers, with `progress_percent`
/// derived from the stored counters rather than persisted itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobView {
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
    pub created_at: chrono::NaiveDateTime,
    pub completed_at: Option<chrono::NaiveDateTime>,
    pub progress_percent: Option<i64>,
}

impl From<DbJob> for JobView {
    fn from(job: DbJob) -> Self {
        let progress_percent = match job.total_games {
            Some(total) if total > 0 => Some((100 * job.processed_games as i64) / total as i64),
            _ => None,
        };
        Self {
            id: job.id,
            account_id: job.account_id,
            file_name: job.file_name,
            status: job.status,
            total_games: job.total_games,
            processed_games: job.processed_games,
            duplicate_games: job.duplicate_games,
            archives_processed: job.archives_processed,
            total_archives: job.total_archives,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
            progress_percent,
        }
    }
}

#[derive(rocket::form::FromForm)]
pub struct UploadForm<'r> {
    file: TempFile<'r>,
}

/// `POST /accounts/{id}/upload`: stores the uploaded file as
/// `<uuid>_<original_name>` under the configured upload directory and
/// hands it to the Coordinator, which counts games and streams them
/// through the parser in the background.
#[post("/accounts/<account_id>/upload", data = "<form>")]
pub async fn upload(
    pool: &State<ConnectionPool>,
    coordinator: &State<Coordinator>,
    config: &State<IngestConfig>,
    account_id: i64,
    mut form: Form<UploadForm<'_>>,
) -> Result<(Status, Json<JobView>), ApiError> {
    require_account(pool, account_id).await?;

    let original_name = form
        .file
        .raw_name()
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "upload.pgn".to_string());
    let stored_path = config
        .upload_dir
        .join(format!("{}_{}", Uuid::new_v4(), original_name));

    form.file
        .copy_to(&stored_path)
        .await
        .map_err(ApiError::Upload)?;

    let job = coordinator
        .enqueue_file_import(account_id, stored_path, original_name)
        .await?;

    Ok((Status::Accepted, Json(job.into())))
}

/// `POST /accounts/{id}/import/chesscom`: 400 if the account isn't a
/// Chess.com account or already has an active import, 404 if it doesn't
/// exist, else 202 + the new Job.
#[post("/accounts/<account_id>/import/chesscom")]
pub async fn import_chesscom(
    coordinator: &State<Coordinator>,
    account_id: i64,
) -> Result<(Status, Json<JobView>), ApiError> {
    let job = coordinator.enqueue_chesscom_import(account_id).await?;
    Ok((Status::Accepted, Json(job.into())))
}

/// `POST /accounts/{id}/import/lichess`: analogous to the Chess.com route.
#[post("/accounts/<account_id>/import/lichess")]
pub async fn import_lichess(
    coordinator: &State<Coordinator>,
    account_id: i64,
) -> Result<(Status, Json<JobView>), ApiError> {
    let job = coordinator.enqueue_lichess_import(account_id).await?;
    Ok((Status::Accepted, Json(job.into())))
}

/// `GET /accounts/{id}/jobs/{job_id}`: a read-only snapshot, safe to poll
/// as often as the client likes. Jobs belonging to a different account
/// are reported as not found rather than leaked across accounts.
#[get("/accounts/<account_id>/jobs/<job_id>")]
pub async fn get_job(
    pool: &State<ConnectionPool>,
    account_id: i64,
    job_id: i64,
) -> Result<Json<JobView>, ApiError> {
    let job = query(pool, move |conn| chess_db::db::get(conn, job_id)).await?;
    let job = job.ok_or(ApiError::JobNotFound(job_id))?;
    if job.account_id != account_id {
        return Err(ApiError::JobNotFound(job_id));
    }
    Ok(Json(job.into()))
}

async fn require_account(pool: &State<ConnectionPool>, account_id: i64) -> Result<(), ApiError> {
    let account = query(pool, move |conn| chess_db::db::get_account(conn, account_id)).await?;
    account
        .ok_or(ApiError::AccountNotFound(account_id))
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(total_games: Option<i32>, processed_games: i32) -> DbJob {
        DbJob {
            id: 1,
            account_id: 1,
            file_name: None,
            status: "PROCESSING".to_string(),
            total_games,
            processed_games,
            duplicate_games: 0,
            archives_processed: None,
            total_archives: None,
            error_message: None,
            created_at: chrono::Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    #[test]
    fn progress_percent_floors_the_ratio() {
        let view: JobView = job(Some(3), 1).into();
        assert_eq!(view.progress_percent, Some(33));
    }

    #[test]
    fn progress_percent_is_none_without_a_known_total() {
        let view: JobView = job(None, 5).into();
        assert_eq!(view.progress_percent, None);

        let view: JobView = job(Some(0), 0).into();
        assert_eq!(view.progress_percent, None);
    }
}
