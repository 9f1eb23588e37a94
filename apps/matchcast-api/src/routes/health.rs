use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Jobs waiting for a dispatcher worker.
    pub queued_jobs: usize,
    /// Queue size the dispatcher was started with.
    pub queue_capacity: usize,
    pub workers: usize,
    pub observers: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.dispatcher.is_running() { "ok" } else { "draining" };
    Json(HealthResponse {
        status: status.to_string(),
        queued_jobs: state.dispatcher.queued(),
        queue_capacity: state.config.queue_capacity,
        workers: state.config.workers,
        observers: state.publisher.observer_count().await,
    })
}
