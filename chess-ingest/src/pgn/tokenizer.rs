use std::collections::HashMap;

use log::debug;
use regex::Regex;
use std::sync::LazyLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::normalize::{ParsedGame, normalize};

static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[([A-Za-z]+)\s+"([^"]*)"\]$"#).expect("valid regex"));

/// A fully assembled but not-yet-normalized game: headers plus the raw move
/// text, in the order the tokenizer saw them.
#[derive(Debug, Default, Clone)]
struct RawGame {
    headers: HashMap<String, String>,
    moves: String,
}

impl RawGame {
    fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.moves.is_empty()
    }

    fn push_move_line(&mut self, line: &str) {
        if !self.moves.is_empty() {
            self.moves.push(' ');
        }
        self.moves.push_str(line);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Headers,
    Moves,
}

/// Counts `[Event "..."]` header lines without assembling any games. Used
/// only for progress totals on file upload.
pub fn count_games(path: &std::path::Path) -> std::io::Result<usize> {
    use std::io::BufRead;

    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim_start().starts_with("[Event ") {
            count += 1;
        }
    }
    Ok(count)
}

/// Parses a single already-delimited PGN game (Chess.com returns each game
/// as its own string). Returns `None` if the text yields no valid game.
pub fn parse_one(text: &str, username: &str) -> Option<ParsedGame> {
    let mut headers = HashMap::new();
    let mut moves = String::new();
    let mut in_headers = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !headers.is_empty() {
                in_headers = false;
            }
            continue;
        }
        if let Some(caps) = HEADER_LINE.captures(trimmed) {
            if in_headers {
                headers.insert(caps[1].to_string(), caps[2].to_string());
                continue;
            }
        }
        in_headers = false;
        if !moves.is_empty() {
            moves.push(' ');
        }
        moves.push_str(trimmed);
    }

    normalize(&headers, &moves, username)
}

/// Parses a stream of PGN text, invoking `emit` once per well-formed game.
/// Malformed games (normalizer returns `None`) are dropped silently.
pub async fn parse_stream<R, F>(mut reader: R, username: &str, mut emit: F) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(ParsedGame),
{
    let mut state = State::Headers;
    let mut current = RawGame::default();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        feed_line(trimmed, &mut state, &mut current, &mut emit, username);
    }

    if !current.is_empty() {
        emit_if_valid(&current, username, &mut emit);
    }

    Ok(())
}

fn feed_line<F>(
    line: &str,
    state: &mut State,
    current: &mut RawGame,
    emit: &mut F,
    username: &str,
) where
    F: FnMut(ParsedGame),
{
    let trimmed = line.trim();
    let is_header = HEADER_LINE.is_match(trimmed);

    match *state {
        State::Headers => {
            if is_header {
                if let Some(caps) = HEADER_LINE.captures(trimmed) {
                    current
                        .headers
                        .insert(caps[1].to_string(), caps[2].to_string());
                }
            } else {
                *state = State::Moves;
                if !trimmed.is_empty() {
                    current.push_move_line(trimmed);
                }
            }
        }
        State::Moves => {
            if trimmed.is_empty() || is_header {
                emit_if_valid(current, username, emit);
                *current = RawGame::default();
                *state = State::Headers;
                if is_header {
                    feed_line(line, state, current, emit, username);
                }
            } else {
                current.push_move_line(trimmed);
            }
        }
    }
}

fn emit_if_valid<F>(raw: &RawGame, username: &str, emit: &mut F)
where
    F: FnMut(ParsedGame),
{
    match normalize(&raw.headers, &raw.moves, username) {
        Some(game) => emit(game),
        None => debug!("dropping malformed or non-matching game during tokenization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_db::types::Color;

    async fn collect(pgn: &str, username: &str) -> Vec<ParsedGame> {
        let mut games = Vec::new();
        parse_stream(pgn.as_bytes(), username, |g| games.push(g))
            .await
            .unwrap();
        games
    }

    #[tokio::test]
    async fn tolerates_missing_blank_line_between_games() {
        let pgn = concat!(
            "[Event \"Game 1\"]\n",
            "[White \"alice\"]\n",
            "[Black \"bob\"]\n",
            "[Result \"1-0\"]\n",
            "\n",
            "1. e4 e5 1-0\n",
            "[Event \"Game 2\"]\n",
            "[White \"carol\"]\n",
            "[Black \"alice\"]\n",
            "[Result \"0-1\"]\n",
            "\n",
            "1. d4 d5 0-1\n",
        );

        let games = collect(pgn, "alice").await;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].color, Color::White);
        assert_eq!(games[1].color, Color::Black);
    }

    #[tokio::test]
    async fn flushes_final_game_at_end_of_stream_without_trailing_blank_line() {
        let pgn = "[White \"alice\"]\n[Black \"bob\"]\n[Result \"1/2-1/2\"]\n\n1. e4 e5";
        let games = collect(pgn, "alice").await;
        assert_eq!(games.len(), 1);
    }

    #[test]
    fn count_games_counts_event_headers() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("tokenizer-test-{}.pgn", std::process::id()));
        std::fs::write(
            &path,
            "[Event \"a\"]\n[White \"x\"]\n[Black \"y\"]\n\n1. e4 1-0\n\n[Event \"b\"]\n[White \"x\"]\n[Black \"y\"]\n\n1. d4 0-1\n",
        )
        .unwrap();
        assert_eq!(count_games(&path).unwrap(), 2);
        std::fs::remove_file(&path).unwrap();
    }
}
