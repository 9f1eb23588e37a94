//! Broadcast trigger endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::broadcast::types::Message;
use crate::broadcast::BroadcastOutcome;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/broadcasts/{event_id}", post(trigger_broadcast))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    /// Team channels whose subscribers receive the message.
    pub channels: Vec<String>,
}

const DEFAULT_TITLE: &str = "Football APP";

#[utoipa::path(
    post,
    path = "/api/v1/broadcasts/{event_id}",
    tag = "Broadcasts",
    params(
        ("event_id" = String, Path, description = "Match ID the broadcast belongs to"),
    ),
    request_body = BroadcastRequest,
    responses(
        (status = 202, description = "Broadcast queued", body = BroadcastOutcome),
        (status = 200, description = "Already sent or nobody to notify", body = BroadcastOutcome),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 502, description = "Storage dependency failed", body = ApiErrorBody),
        (status = 503, description = "Queue full or shutting down", body = ApiErrorBody),
    ),
)]
pub async fn trigger_broadcast(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<BroadcastOutcome>), ApiError> {
    let channels: Vec<String> = body
        .channels
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if channels.is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "channels".to_string(),
            message: "At least one channel is required".to_string(),
        }]));
    }

    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let message = Message::new(title, body.content);

    let outcome = state
        .orchestrator
        .broadcast(&event_id, message, &channels)
        .await?;

    let status = match outcome {
        BroadcastOutcome::Dispatched { .. } => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
