use axum::extract::State;
use axum::response::IntoResponse;

use crate::AppState;

/// GET /metrics renders process metrics in Prometheus text format.
pub async fn prometheus(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}
