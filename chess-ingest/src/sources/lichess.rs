use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::JobFailure;
use crate::pgn::{ParsedGame, parse_stream};
use provider_fetch::Fetcher;

const ACCEPT: &str = "application/x-chess-pgn";

/// Streams the user's full game history (or everything since
/// `last_sync_at`) through the PGN parser, handing each game to `emit`.
/// Lichess doesn't report a total up front; the coordinator is expected to
/// treat `processed_games` as its own running total.
pub async fn run<F>(
    fetcher: &Fetcher,
    username: &str,
    last_sync_at: Option<NaiveDateTime>,
    cancel: &CancellationToken,
    mut emit: F,
) -> Result<(), JobFailure>
where
    F: FnMut(ParsedGame),
{
    let url = request_url(username, last_sync_at);

    let reader = match fetcher.fetch_reader(&url, Some(ACCEPT), cancel).await {
        Ok(reader) => reader,
        Err(provider_fetch::FetchError::NotFound { .. }) => {
            return Err(JobFailure::AccountNotFound {
                provider: "Lichess",
                username: username.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    parse_stream(reader, username, |game| emit(game))
        .await
        .map_err(JobFailure::Io)
}

/// Builds the streaming-games request URL, adding `since=<epoch_ms>` when
/// `last_sync_at` is present. Split out from [`run`] so the query
/// construction is testable without a live HTTP call.
fn request_url(username: &str, last_sync_at: Option<NaiveDateTime>) -> String {
    let mut url = format!(
        "https://lichess.org/api/games/user/{}?moves=true&tags=true&clocks=false&evals=false&opening=true",
        username.to_lowercase()
    );
    if let Some(last_sync_at) = last_sync_at {
        url.push_str(&format!(
            "&since={}",
            last_sync_at.and_utc().timestamp_millis()
        ));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_since_when_last_sync_at_is_absent() {
        let url = request_url("Alice", None);
        assert_eq!(
            url,
            "https://lichess.org/api/games/user/alice?moves=true&tags=true&clocks=false&evals=false&opening=true"
        );
    }

    #[test]
    fn includes_since_as_epoch_millis_utc() {
        let last_sync_at =
            NaiveDateTime::parse_from_str("2024-06-15 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let url = request_url("alice", Some(last_sync_at));
        assert!(url.contains(&format!(
            "&since={}",
            last_sync_at.and_utc().timestamp_millis()
        )));
        assert_eq!(last_sync_at.and_utc().timestamp_millis(), 1718452800000);
    }
}
