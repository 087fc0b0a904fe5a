//! Provider-specific pipelines that drive the PGN parser and feed parsed
//! games to the coordinator's per-game handler.

mod chesscom;
mod file;
mod lichess;

pub use chesscom::{filtered_archives as run_chesscom_archives, run as run_chesscom};
pub use file::{count as count_file_games, run as run_file};
pub use lichess::run as run_lichess;
