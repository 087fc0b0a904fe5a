mod accounts;
mod analytics;
mod blocking;
pub mod error;
mod jobs;

#[rocket::get("/")]
fn index() -> &'static str {
    "Chess game ingestion & analytics API."
}

pub fn routes() -> Vec<rocket::Route> {
    rocket::routes![
        index,
        accounts::create_account,
        accounts::get_account,
        accounts::list_accounts,
        accounts::delete_account,
        jobs::upload,
        jobs::import_chesscom,
        jobs::import_lichess,
        jobs::get_job,
        analytics::daily,
        analytics::results,
    ]
}
