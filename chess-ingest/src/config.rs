use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Layered configuration: defaults, then `chess-ingest.toml` if present,
/// then `CHESS_INGEST_*` environment variables, each overriding the last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory uploaded PGN files are written to before ingestion.
    /// Created on startup if missing.
    pub upload_dir: PathBuf,
    /// Number of games between progress-counter flushes for file imports.
    pub file_progress_interval: u32,
    /// Number of games between progress-counter flushes for API sources.
    pub api_progress_interval: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            file_progress_interval: 50,
            api_progress_interval: 100,
        }
    }
}

impl IngestConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(IngestConfig::default()))
            .merge(Toml::file("chess-ingest.toml"))
            .merge(Env::prefixed("CHESS_INGEST_"))
            .extract()
    }
}
