use chrono::{Datelike, NaiveDateTime};
use log::warn;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

use crate::error::JobFailure;
use crate::pgn::{ParsedGame, parse_one};
use provider_fetch::{Fetcher, Provider};

static ARCHIVE_URL_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/games/(\d{4})/(\d{2})$").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct ArchiveList {
    archives: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ArchiveGames {
    games: Vec<ArchiveGame>,
}

#[derive(Debug, Deserialize)]
struct ArchiveGame {
    pgn: Option<String>,
}

/// Fetches the archive list for `username`, dropping archives strictly
/// before the year-month of `last_sync_at` (an absent `last_sync_at` keeps
/// everything; an archive URL that doesn't match the `YYYY/MM` pattern is
/// kept conservatively).
pub async fn filtered_archives(
    fetcher: &Fetcher,
    username: &str,
    last_sync_at: Option<NaiveDateTime>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, JobFailure> {
    let url = format!(
        "https://api.chess.com/pub/player/{}/games/archives",
        username.to_lowercase()
    );
    let body = match fetcher.fetch_text(&url, cancel).await {
        Ok(body) => body,
        Err(provider_fetch::FetchError::NotFound { .. }) => {
            return Err(JobFailure::AccountNotFound {
                provider: "Chess.com",
                username: username.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let list: ArchiveList = serde_json::from_str(&body).unwrap_or(ArchiveList { archives: vec![] });

    Ok(filter_archive_urls(list.archives, last_sync_at))
}

/// Drops archive URLs strictly before the year-month of `cutoff`. Split out
/// from [`filtered_archives`] so the filtering rule can be tested without a
/// live HTTP call.
fn filter_archive_urls(archives: Vec<String>, cutoff: Option<NaiveDateTime>) -> Vec<String> {
    let Some(cutoff) = cutoff else {
        return archives;
    };
    let cutoff_year = cutoff.year();
    let cutoff_month = cutoff.month();

    archives
        .into_iter()
        .filter(|archive_url| match ARCHIVE_URL_MONTH.captures(archive_url) {
            Some(caps) => {
                let year: i32 = caps[1].parse().unwrap_or(cutoff_year);
                let month: u32 = caps[2].parse().unwrap_or(cutoff_month);
                (year, month) >= (cutoff_year, cutoff_month)
            }
            None => true,
        })
        .collect()
}

/// Fetches each archive in order, parsing each `pgn` entry and handing the
/// result to `emit`. After each archive, calls `on_archive_done` with the
/// running total of games seen so far so the coordinator can flush
/// `archives_processed`/`total_games`. A non-retryable archive failure is
/// logged and skipped; it does not fail the job.
pub async fn run<F, A>(
    fetcher: &Fetcher,
    archive_urls: &[String],
    username: &str,
    cancel: &CancellationToken,
    mut emit: F,
    mut on_archive_done: A,
) -> Result<(), JobFailure>
where
    F: FnMut(ParsedGame),
    A: FnMut(usize),
{
    debug_assert_eq!(fetcher.provider(), Provider::ChessCom);

    let mut games_seen = 0usize;
    for archive_url in archive_urls {
        match fetcher.fetch_text(archive_url, cancel).await {
            Ok(body) => {
                let parsed: ArchiveGames = match serde_json::from_str(&body) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("archive {archive_url} returned unparseable JSON: {e}");
                        on_archive_done(games_seen);
                        continue;
                    }
                };
                for game in parsed.games {
                    if let Some(pgn) = game.pgn {
                        if let Some(parsed_game) = parse_one(&pgn, username) {
                            emit(parsed_game);
                        }
                        games_seen += 1;
                    }
                }
            }
            Err(provider_fetch::FetchError::Cancelled { .. }) => {
                return Err(JobFailure::Cancelled);
            }
            Err(e) => {
                warn!("archive {archive_url} failed non-retryably: {e}");
            }
        }
        on_archive_done(games_seen);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archives() -> Vec<String> {
        vec![
            "https://api.chess.com/pub/player/x/games/2024/03".to_string(),
            "https://api.chess.com/pub/player/x/games/2024/06".to_string(),
            "https://api.chess.com/pub/player/x/games/2024/07".to_string(),
        ]
    }

    #[test]
    fn keeps_everything_when_last_sync_at_is_absent() {
        assert_eq!(filter_archive_urls(archives(), None).len(), 3);
    }

    #[test]
    fn drops_archives_strictly_before_the_cutoff_month() {
        let cutoff = NaiveDateTime::parse_from_str("2024-06-15 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let kept = filter_archive_urls(archives(), Some(cutoff));
        assert_eq!(
            kept,
            vec![
                "https://api.chess.com/pub/player/x/games/2024/06".to_string(),
                "https://api.chess.com/pub/player/x/games/2024/07".to_string(),
            ]
        );
    }

    #[test]
    fn keeps_unrecognized_urls_conservatively() {
        let cutoff = NaiveDateTime::parse_from_str("2024-06-15 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let archives = vec!["https://api.chess.com/pub/player/x/games/weird".to_string()];
        assert_eq!(filter_archive_urls(archives.clone(), Some(cutoff)), archives);
    }
}
