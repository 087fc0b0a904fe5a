use chess_db::pool::ConnectionPool;
use chess_db::{PgConnection, QueryError};

use super::error::ApiError;

/// Runs a Diesel closure on a blocking thread and gets a pooled
/// connection for it. Every handler in this crate goes through here
/// rather than calling Diesel directly on the async reactor thread.
pub async fn query<F, T>(pool: &ConnectionPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut PgConnection) -> Result<T, QueryError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().expect("pool not poisoned");
        f(&mut conn)
    })
    .await
    .expect("blocking query task panicked")
    .map_err(ApiError::from)
}
