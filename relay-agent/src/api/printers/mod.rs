//! Printer catalog API
//!
//! | Path | Method | Operation |
//! |------|--------|-----------|
//! | /api/printers | GET | list printers and the default |
//! | /api/printers | POST | add an operator printer |
//! | /api/printers/default | PUT | set the default printer |
//! | /api/printers/{id} | DELETE | delete a printer |
//! | /api/printers/{id}/status | GET | probe a printer |

mod handler;

use axum::Router;
use axum::routing::{delete, get, put};

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/printers", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/default", put(handler::set_default))
        .route("/{id}", delete(handler::delete))
        .route("/{id}/status", get(handler::status))
}
