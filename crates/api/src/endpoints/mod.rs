//! API endpoints.

mod instances;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::middleware::AppState;

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/instances", instances::router())
        .route("/health", get(health))
}
