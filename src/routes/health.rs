use axum::response::IntoResponse;
use axum::Json;

/// GET /version → {"version": "...", "type": "proxy"}
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "type": "proxy",
    }))
}
