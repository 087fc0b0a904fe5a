//! Store implementations backing the Game Store, Job Store and Account
//! Store. Each submodule owns one table and exposes plain functions taking
//! `&mut PgConnection` — callers (the ingest coordinator, the HTTP layer)
//! manage the pooled connection and transaction boundary.

mod accounts;
mod games;
mod jobs;

pub use accounts::*;
pub use games::*;
pub use jobs::*;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("database query failed")]
    Diesel(#[from] diesel::result::Error),
}
