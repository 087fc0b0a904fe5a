//! Small enums stored as `Text` columns in Postgres.
//!
//! Cardinalities here are tiny (three to seven variants each), so rather
//! than the lookup-table ("taxa") approach, each enum just round-trips
//! through its `Display`/`FromStr` impl at the Rust/DB boundary.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    ChessCom,
    Lichess,
    Other,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::ChessCom => "CHESS_COM",
            Platform::Lichess => "LICHESS",
            Platform::Other => "OTHER",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHESS_COM" => Ok(Platform::ChessCom),
            "LICHESS" => Ok(Platform::Lichess),
            "OTHER" => Ok(Platform::Other),
            other => Err(UnknownVariant::new("Platform", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(UnknownVariant::new("JobStatus", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameResult::Win => "WIN",
            GameResult::Loss => "LOSS",
            GameResult::Draw => "DRAW",
        };
        f.write_str(s)
    }
}

impl FromStr for GameResult {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WIN" => Ok(GameResult::Win),
            "LOSS" => Ok(GameResult::Loss),
            "DRAW" => Ok(GameResult::Draw),
            other => Err(UnknownVariant::new("GameResult", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        };
        f.write_str(s)
    }
}

impl FromStr for Color {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WHITE" => Ok(Color::White),
            "BLACK" => Ok(Color::Black),
            other => Err(UnknownVariant::new("Color", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlCategory {
    Ultrabullet,
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Correspondence,
    Unknown,
}

impl fmt::Display for TimeControlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeControlCategory::Ultrabullet => "ULTRABULLET",
            TimeControlCategory::Bullet => "BULLET",
            TimeControlCategory::Blitz => "BLITZ",
            TimeControlCategory::Rapid => "RAPID",
            TimeControlCategory::Classical => "CLASSICAL",
            TimeControlCategory::Correspondence => "CORRESPONDENCE",
            TimeControlCategory::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeControlCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ULTRABULLET" => Ok(TimeControlCategory::Ultrabullet),
            "BULLET" => Ok(TimeControlCategory::Bullet),
            "BLITZ" => Ok(TimeControlCategory::Blitz),
            "RAPID" => Ok(TimeControlCategory::Rapid),
            "CLASSICAL" => Ok(TimeControlCategory::Classical),
            "CORRESPONDENCE" => Ok(TimeControlCategory::Correspondence),
            "UNKNOWN" => Ok(TimeControlCategory::Unknown),
            other => Err(UnknownVariant::new("TimeControlCategory", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{type_name} has no variant named {value:?}")]
pub struct UnknownVariant {
    type_name: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(type_name: &'static str, value: &str) -> Self {
        Self {
            type_name,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips() {
        for p in [Platform::ChessCom, Platform::Lichess, Platform::Other] {
            let s = p.to_string();
            assert_eq!(Platform::from_str(&s).unwrap(), p);
        }
    }

    #[test]
    fn job_status_active_terminal() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Processing.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn unknown_variant_is_an_error() {
        assert!(Platform::from_str("NOT_A_PLATFORM").is_err());
    }
}
