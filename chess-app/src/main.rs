//! The HTTP surface: account CRUD, the three import entry points, job
//! polling, and the read-side analytics queries. Everything that actually
//! does the work lives in `chess-db` and `chess-ingest`; this crate is thin
//! by design, owning the Rocket wiring and calling into the library crates.

mod api;

use chess_db::pool::ConnectionPool;
use chess_ingest::{Coordinator, IngestConfig};
use rocket::{Build, Rocket, launch};

/// Runs pending Diesel migrations before the server starts accepting
/// requests.
fn run_migrations() {
    chess_db::migrations::run_migrations().expect("failed to run database migrations");
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    run_migrations();

    let config = IngestConfig::load().expect("failed to load ingest configuration");
    std::fs::create_dir_all(&config.upload_dir).expect("failed to create upload directory");

    let pool: ConnectionPool = chess_db::pool::get_pool(10).expect("failed to build connection pool");
    let coordinator = Coordinator::new(pool.clone(), config.clone());

    let cors = rocket_cors::CorsOptions::default()
        .to_cors()
        .expect("CORS specification should be valid");

    rocket::build()
        .attach(cors)
        .manage(pool)
        .manage(coordinator)
        .manage(config)
        .mount("/", api::routes())
}
