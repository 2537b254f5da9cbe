use crate::error::ProxyServerError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use sparql_proxy_engine::TaskSummary;

pub fn create_jobs_routes() -> Router<AppState> {
    Router::new().route("/jobs/{token}", get(handle_job_status))
}

/// Looks up the most recent job submitted with `token`.
async fn handle_job_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<TaskSummary>, ProxyServerError> {
    state
        .proxy
        .job_status(&token)
        .await?
        .map(Json)
        .ok_or(ProxyServerError::NotFound("Job not found"))
}
