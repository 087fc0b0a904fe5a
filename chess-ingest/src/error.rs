use miette::Diagnostic;
use thiserror::Error;

/// Errors that can escape a running job and must terminate it as `FAILED`.
/// Per-game and per-archive failures never reach this type; they're
/// absorbed where they occur (see `coordinator`).
#[derive(Debug, Error, Diagnostic)]
pub enum JobFailure {
    #[error("User not found on {provider}: {username}")]
    AccountNotFound { provider: &'static str, username: String },

    #[error(transparent)]
    Fetch(#[from] provider_fetch::FetchError),

    #[error(transparent)]
    Query(#[from] chess_db::QueryError),

    #[error("Request interrupted")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Diagnostic)]
pub enum EnqueueError {
    #[error("account {account_id} does not accept {platform} imports")]
    WrongPlatform { account_id: i64, platform: &'static str },

    #[error("account {account_id} already has an import in progress")]
    ImportAlreadyActive { account_id: i64 },

    #[error("account {account_id} not found")]
    AccountNotFound { account_id: i64 },

    #[error(transparent)]
    Query(#[from] chess_db::QueryError),
}
