//! Local HTTP API
//!
//! - [`health`] - liveness
//! - [`printers`] - catalog management and status probes
//! - [`print`] - receipts, images, category-split bills

pub mod health;
pub mod print;
pub mod printers;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::PrintService;

/// Shared state of every handler
pub type AppState = Arc<PrintService>;

/// All routes, no middleware
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(printers::router())
        .merge(print::router())
}

/// Routes plus middleware, with state attached
pub fn build_app(state: AppState) -> Router {
    build_router()
        // The dashboard runs in a webview on another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
