#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;

use matchcast_api::broadcast::types::DeliveryType;
use matchcast_api::config::Config;
use matchcast_api::db::{MemoryBroadcastRepository, MemoryFanRepository};
use matchcast_api::delivery::{DeliveryExecutor, Executors};
use matchcast_api::models::fan::Fan;
use matchcast_api::AppState;

/// The two-team fixture used across the integration tests.
pub fn team_fans() -> Vec<Fan> {
    vec![
        Fan::new("fan1", "TeamA", DeliveryType::Push, "device-1"),
        Fan::new("fan2", "TeamA", DeliveryType::Email, "fan2@example.com"),
        Fan::new("fan3", "TeamB", DeliveryType::Sms, "+5511999990000"),
    ]
}

/// Build a test AppState with in-memory stores and fault-free executors.
pub fn test_state() -> AppState {
    let config = Config::reliable();
    let executor: Arc<dyn DeliveryExecutor> = Arc::new(Executors::new(&config.delivery_config()));
    test_state_with(config, executor)
}

pub fn test_state_with(config: Config, executor: Arc<dyn DeliveryExecutor>) -> AppState {
    AppState::with_parts(
        config,
        Arc::new(MemoryFanRepository::with_fans(team_fans())),
        Arc::new(MemoryBroadcastRepository::new()),
        executor,
    )
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = matchcast_api::routes::router().with_state(state.clone());
    (app, state)
}
