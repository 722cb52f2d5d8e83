//! `GET /downloads` — run the download check and return the active report.

use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::error;

/// Runs one full sweep, reconciles the report, and responds with the
/// currently active outage report, or `{}` when downloads are healthy.
pub(super) async fn handler_downloads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.checker.run().await {
        Ok(run) => match run.active {
            Some(report) => Json(serde_json::json!(report)).into_response(),
            None => Json(serde_json::json!({})).into_response(),
        },
        Err(e) => {
            error!(error = %e, "download check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": format!("{:#}", e)})),
            )
                .into_response()
        }
    }
}
