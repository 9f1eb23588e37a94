//! Fan subscription endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::broadcast::types::{DeliveryType, Subscription};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::fan::Fan;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", post(create_subscription))
        .route("/fans/{user_id}/subscriptions", get(list_user_subscriptions))
}

// ---------------------------------------------------------------------------
// POST /api/v1/subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub user_id: String,
    /// The team channel to follow.
    pub channel_id: String,
    pub notification_type: DeliveryType,
    pub address: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    tag = "Subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = Fan),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 502, description = "Fan store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Fan>), ApiError> {
    let user_id = body.user_id.trim();
    let channel_id = body.channel_id.trim();
    let address = body.address.trim();

    let mut errors = Vec::new();
    for (field, value) in [("user_id", user_id), ("channel_id", channel_id), ("address", address)] {
        if value.is_empty() {
            errors.push(FieldError {
                field: field.to_string(),
                message: format!("{field} is required"),
            });
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let fan = Fan::new(user_id, channel_id, body.notification_type, address);
    state.fans.create(&fan).await?;

    // An unloaded channel picks the fan up from the store on first use.
    state.registry.track_subscription(Subscription::from(fan.clone()));

    tracing::info!(
        fan_id = %fan.id,
        channel_id = %fan.channel_id,
        notification_type = %fan.notification_type,
        "subscription created"
    );

    Ok((StatusCode::CREATED, Json(fan)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/fans/:user_id/subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ListSubscriptionsResponse {
    pub data: Vec<Fan>,
}

#[utoipa::path(
    get,
    path = "/api/v1/fans/{user_id}/subscriptions",
    tag = "Subscriptions",
    params(
        ("user_id" = String, Path, description = "Fan user ID"),
    ),
    responses(
        (status = 200, description = "Subscriptions held by the fan", body = ListSubscriptionsResponse),
        (status = 502, description = "Fan store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn list_user_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListSubscriptionsResponse>, ApiError> {
    let data = state.fans.get_by_user(&user_id).await?;
    Ok(Json(ListSubscriptionsResponse { data }))
}
