use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chess_db::types::{Color, GameResult, TimeControlCategory};
use sha2::{Digest, Sha256};

/// A normalized, validated game ready for the store. Construction always
/// goes through [`normalize`], which is the only place invalid
/// combinations are rejected.
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub played_at: NaiveDateTime,
    pub result: GameResult,
    pub color: Color,
    pub opponent: Option<String>,
    pub time_control_raw: Option<String>,
    pub time_control_category: TimeControlCategory,
    pub eco_code: Option<String>,
    pub opening_name: Option<String>,
    pub pgn_hash: String,
}

/// Applies the normalization rules to a header map and move text. Returns
/// `None` when `username` matches neither the `White` nor `Black` header,
/// or when any required field otherwise fails to resolve.
pub fn normalize(
    headers: &HashMap<String, String>,
    moves: &str,
    username: &str,
) -> Option<ParsedGame> {
    let white = headers.get("White").map(String::as_str).unwrap_or("");
    let black = headers.get("Black").map(String::as_str).unwrap_or("");

    let color = if username.eq_ignore_ascii_case(white) {
        Color::White
    } else if username.eq_ignore_ascii_case(black) {
        Color::Black
    } else {
        return None;
    };

    let opponent = match color {
        Color::White => non_empty(black),
        Color::Black => non_empty(white),
    };

    let result_token = headers.get("Result").map(String::as_str).unwrap_or("*");
    let result = match result_token {
        "1-0" => {
            if color == Color::White {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        }
        "0-1" => {
            if color == Color::Black {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        }
        _ => GameResult::Draw,
    };

    let played_at = parse_timestamp(headers);

    let time_control_raw = headers.get("TimeControl").cloned();
    let time_control_category = categorize_time_control(time_control_raw.as_deref());

    let eco_code = headers.get("ECO").cloned().filter(|s| !s.is_empty());
    let opening_name = headers.get("Opening").cloned().filter(|s| !s.is_empty());

    let pgn_hash = fingerprint(headers, moves);

    Some(ParsedGame {
        played_at,
        result,
        color,
        opponent,
        time_control_raw,
        time_control_category,
        eco_code,
        opening_name,
        pgn_hash,
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Parses `Date` as `yyyy.MM.dd` and `UTCTime`/`Time` as `HH:mm:ss`. A
/// missing or sentinel (`"????.??.??"`-style) date falls back to today's
/// UTC date; a missing time falls back to midnight.
fn parse_timestamp(headers: &HashMap<String, String>) -> NaiveDateTime {
    let date_header = headers.get("Date").map(String::as_str);
    let date = date_header
        .filter(|s| !s.contains('?'))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y.%m.%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());

    let time_header = headers
        .get("UTCTime")
        .or_else(|| headers.get("Time"))
        .map(String::as_str);
    let time = time_header
        .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is valid"));

    NaiveDateTime::new(date, time)
}

fn categorize_time_control(raw: Option<&str>) -> TimeControlCategory {
    let raw = match raw {
        Some(r) if r != "-" && !r.is_empty() => r,
        _ => return TimeControlCategory::Unknown,
    };

    if raw.contains('/') {
        return TimeControlCategory::Correspondence;
    }

    let prefix_end = raw
        .find(|c: char| c == '+' || c == '/')
        .unwrap_or(raw.len());

    match raw[..prefix_end].parse::<i64>() {
        Ok(base_seconds) if base_seconds < 30 => TimeControlCategory::Ultrabullet,
        Ok(base_seconds) if base_seconds < 180 => TimeControlCategory::Bullet,
        Ok(base_seconds) if base_seconds < 600 => TimeControlCategory::Blitz,
        Ok(base_seconds) if base_seconds < 1800 => TimeControlCategory::Rapid,
        Ok(_) => TimeControlCategory::Classical,
        Err(_) => TimeControlCategory::Unknown,
    }
}

/// SHA-256 of `Date ∥ White ∥ Black ∥ Result ∥ first_200_chars(collapse_ws(moves))`,
/// rendered as 64 lowercase hex characters.
fn fingerprint(headers: &HashMap<String, String>, moves: &str) -> String {
    let date = headers.get("Date").map(String::as_str).unwrap_or("");
    let white = headers.get("White").map(String::as_str).unwrap_or("");
    let black = headers.get("Black").map(String::as_str).unwrap_or("");
    let result = headers.get("Result").map(String::as_str).unwrap_or("");

    let collapsed = collapse_whitespace(moves);
    let truncated: String = collapsed.chars().take(200).collect();

    let mut hasher = Sha256::new();
    hasher.update(date.as_bytes());
    hasher.update(white.as_bytes());
    hasher.update(black.as_bytes());
    hasher.update(result.as_bytes());
    hasher.update(truncated.as_bytes());

    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn matches_username_case_insensitively_as_white() {
        let h = headers(&[
            ("White", "Magnus"),
            ("Black", "Hikaru"),
            ("Result", "1-0"),
            ("Date", "2024.01.15"),
        ]);
        let parsed = normalize(&h, "1. e4 e5", "magnus").expect("should parse");
        assert_eq!(parsed.color, Color::White);
        assert_eq!(parsed.result, GameResult::Win);
        assert_eq!(parsed.opponent.as_deref(), Some("Hikaru"));
    }

    #[test]
    fn rejects_when_username_matches_neither_side() {
        let h = headers(&[("White", "Magnus"), ("Black", "Hikaru")]);
        assert!(normalize(&h, "1. e4", "someone_else").is_none());
    }

    #[test]
    fn loss_result_when_the_opponent_wins() {
        let h = headers(&[("White", "me"), ("Black", "you"), ("Result", "0-1")]);
        let parsed = normalize(&h, "", "me").unwrap();
        assert_eq!(parsed.color, Color::White);
        assert_eq!(parsed.result, GameResult::Loss);
    }

    #[test]
    fn draw_result_for_half_point_and_unknown_tokens() {
        let h = headers(&[("White", "a"), ("Black", "b"), ("Result", "1/2-1/2")]);
        assert_eq!(normalize(&h, "", "a").unwrap().result, GameResult::Draw);

        let h = headers(&[("White", "a"), ("Black", "b"), ("Result", "*")]);
        assert_eq!(normalize(&h, "", "a").unwrap().result, GameResult::Draw);
    }

    #[test]
    fn missing_or_sentinel_date_falls_back_to_today() {
        let h = headers(&[("White", "a"), ("Black", "b"), ("Date", "????.??.??")]);
        let parsed = normalize(&h, "", "a").unwrap();
        assert_eq!(parsed.played_at.date(), Utc::now().date_naive());
    }

    #[test]
    fn time_control_categorization_matches_thresholds() {
        assert_eq!(categorize_time_control(Some("15")), TimeControlCategory::Ultrabullet);
        assert_eq!(categorize_time_control(Some("60+1")), TimeControlCategory::Bullet);
        assert_eq!(categorize_time_control(Some("300+3")), TimeControlCategory::Blitz);
        assert_eq!(categorize_time_control(Some("900")), TimeControlCategory::Rapid);
        assert_eq!(categorize_time_control(Some("5400")), TimeControlCategory::Classical);
        assert_eq!(categorize_time_control(Some("1/86400")), TimeControlCategory::Correspondence);
        assert_eq!(categorize_time_control(Some("-")), TimeControlCategory::Unknown);
        assert_eq!(categorize_time_control(None), TimeControlCategory::Unknown);
    }

    #[test]
    fn fingerprint_is_64_lowercase_hex_chars() {
        let h = headers(&[("White", "a"), ("Black", "b"), ("Result", "1-0"), ("Date", "2024.01.01")]);
        let parsed = normalize(&h, "1. e4 e5 2. Nf3", "a").unwrap();
        assert_eq!(parsed.pgn_hash.len(), 64);
        assert!(parsed.pgn_hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fingerprint_is_stable_for_identical_inputs() {
        let h = headers(&[("White", "a"), ("Black", "b"), ("Result", "1-0"), ("Date", "2024.01.01")]);
        let one = normalize(&h, "1. e4", "a").unwrap();
        let two = normalize(&h, "1. e4", "a").unwrap();
        assert_eq!(one.pgn_hash, two.pgn_hash);
    }
}
