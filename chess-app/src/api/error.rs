use log::error;
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::serde::json::json;
use rocket::{Request, Response};
use thiserror::Error;

/// Translates store and coordinator errors into the JSON + status code
/// contract the HTTP layer owes its callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("account {account_id} does not accept {platform} imports")]
    WrongPlatform { account_id: i64, platform: &'static str },

    #[error("account {0} already has an import in progress")]
    ImportAlreadyActive(i64),

    #[error("platform must be one of CHESS_COM, LICHESS, OTHER")]
    InvalidPlatform,

    #[error(transparent)]
    Query(#[from] chess_db::QueryError),

    #[error("failed to store uploaded file")]
    Upload(#[source] std::io::Error),
}

impl From<chess_ingest::EnqueueError> for ApiError {
    fn from(value: chess_ingest::EnqueueError) -> Self {
        match value {
            chess_ingest::EnqueueError::AccountNotFound { account_id } => {
                ApiError::AccountNotFound(account_id)
            }
            chess_ingest::EnqueueError::WrongPlatform { account_id, platform } => {
                ApiError::WrongPlatform { account_id, platform }
            }
            chess_ingest::EnqueueError::ImportAlreadyActive { account_id } => {
                ApiError::ImportAlreadyActive(account_id)
            }
            chess_ingest::EnqueueError::Query(e) => ApiError::Query(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::AccountNotFound(_) | ApiError::JobNotFound(_) => Status::NotFound,
            ApiError::WrongPlatform { .. }
            | ApiError::ImportAlreadyActive(_)
            | ApiError::InvalidPlatform => Status::BadRequest,
            ApiError::Query(_) | ApiError::Upload(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'o> {
        error!("{self}");
        let status = self.status();
        let body = json!({ "error": self.to_string() }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}
