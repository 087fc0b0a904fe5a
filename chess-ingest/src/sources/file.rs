use std::path::Path;

use tokio::fs::File;
use tokio::io::BufReader;

use crate::error::JobFailure;
use crate::pgn::{ParsedGame, count_games, parse_stream};

/// Counts `[Event ` headers without materializing games. Used once up
/// front to set the job's `total_games`.
pub fn count(path: &Path) -> Result<usize, JobFailure> {
    count_games(path).map_err(JobFailure::Io)
}

/// Opens the file a second time and streams games to `emit`. No network.
pub async fn run<F>(path: &Path, username: &str, mut emit: F) -> Result<(), JobFailure>
where
    F: FnMut(ParsedGame),
{
    let file = File::open(path).await.map_err(JobFailure::Io)?;
    let reader = BufReader::new(file);
    parse_stream(reader, username, |game| emit(game))
        .await
        .map_err(JobFailure::Io)
}
