//! Instance directory endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fedidir_common::AppResult;
use fedidir_core::{SubmitCandidateInput, SweepReport};
use tracing::info;

use crate::{
    middleware::AppState,
    response::{invalid_method, ApiMessage},
};

/// Submit an instance for listing.
async fn add(
    State(state): State<AppState>,
    input: Result<Json<SubmitCandidateInput>, JsonRejection>,
) -> Response {
    let Json(input) = match input {
        Ok(input) => input,
        Err(rejection) => return ApiMessage::error(rejection.body_text()).into_response(),
    };

    match state.onboarding_service.submit_candidate(input).await {
        Ok(accepted) => {
            info!(instance_id = %accepted.instance_id, uri = %accepted.uri, "Instance submitted");
            ApiMessage::success(accepted.message).into_response()
        }
        Err(e) => {
            info!(error = ?e, "Instance submission rejected");
            ApiMessage::error(e.to_string()).into_response()
        }
    }
}

/// Re-probe instances banned for failing health checks.
async fn retry(State(state): State<AppState>) -> AppResult<ApiMessage<SweepReport>> {
    let report = state.reconciliation_service.retry_banned().await?;
    Ok(ApiMessage::success("successfully updated instances").with_details(report))
}

/// Probe every active instance.
async fn check(State(state): State<AppState>) -> AppResult<ApiMessage<SweepReport>> {
    let report = state.reconciliation_service.check_active().await?;
    Ok(ApiMessage::success("successfully checked instances").with_details(report))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add).fallback(invalid_method))
        .route("/retry", get(retry).fallback(invalid_method))
        .route("/check", get(check).fallback(invalid_method))
}
