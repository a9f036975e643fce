//! Print API
//!
//! All three endpoints fail over across printers; the response names the
//! printer that took the job.

mod handler;

use axum::Router;
use axum::routing::post;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/print", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/receipt", post(handler::receipt))
        .route("/image", post(handler::image))
        .route("/bill", post(handler::bill))
}
