pub mod health;
pub mod metrics;
pub mod queue;

use axum::routing::{any, get};
use axum::Router;

use crate::AppState;

/// Path the static site calls; also what the injector writes into the HTML.
pub const QUEUE_ROUTE: &str = "/api/queue";

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/version", get(health::version))
        .route("/metrics", get(metrics::prometheus))
        // Method dispatch happens inside the handler so disallowed methods
        // get the JSON error body and CORS headers.
        .route(QUEUE_ROUTE, any(queue::queue))
}
