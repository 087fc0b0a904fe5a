mod schema;
mod url;

pub mod db;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod types;

pub(crate) use schema::*;

pub use db::QueryError;
pub use pool::ConnectionPool;
pub use url::postgres_url_from_environment;

pub use diesel::{Connection, PgConnection};
