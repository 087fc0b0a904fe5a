//! The ingestion pipeline: PGN parsing/normalization, the three provider
//! source adapters, and the coordinator that drives a single logical
//! import from `PENDING` through to a terminal job state.
//!
//! This is the core of the system; everything in `chess-db` and
//! `chess-app` exists to give this crate somewhere to read from and write
//! progress to.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod pgn;
pub mod sources;

pub use config::IngestConfig;
pub use coordinator::Coordinator;
pub use error::{EnqueueError, JobFailure};
