pub mod broadcasts;
pub mod health;
pub mod subscriptions;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api/v1",
            subscriptions::router().merge(broadcasts::router()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Subscriptions
        subscriptions::create_subscription,
        subscriptions::list_user_subscriptions,
        // Broadcasts
        broadcasts::trigger_broadcast,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::fan::Fan,
            crate::models::broadcast_record::RecordStatus,
            crate::broadcast::types::DeliveryType,
            crate::broadcast::types::BroadcastStatus,
            crate::broadcast::BroadcastOutcome,
            // Route request/response types
            health::HealthResponse,
            subscriptions::CreateSubscriptionRequest,
            subscriptions::ListSubscriptionsResponse,
            broadcasts::BroadcastRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Subscriptions", description = "Fan subscriptions"),
        (name = "Broadcasts", description = "Match broadcasts"),
    )
)]
pub struct ApiDoc;
