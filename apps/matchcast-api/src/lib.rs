pub mod broadcast;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use broadcast::{BroadcastOrchestrator, Dispatcher, IdempotencyGuard, SubscriptionRegistry};
use config::Config;
use db::{BroadcastRepository, FanRepository, MemoryBroadcastRepository, MemoryFanRepository};
use delivery::{DeliveryExecutor, Executors};
use gateway::StatusPublisher;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SubscriptionRegistry>,
    pub fans: Arc<dyn FanRepository>,
    pub broadcasts: Arc<dyn BroadcastRepository>,
    pub publisher: Arc<StatusPublisher>,
    pub dispatcher: Arc<Dispatcher>,
    pub orchestrator: Arc<BroadcastOrchestrator>,
}

impl AppState {
    /// Wire the engine with in-memory stores and the configured executors.
    pub fn new(config: Config) -> Self {
        let executor: Arc<dyn DeliveryExecutor> = Arc::new(Executors::new(&config.delivery_config()));
        Self::with_parts(
            config,
            Arc::new(MemoryFanRepository::new()),
            Arc::new(MemoryBroadcastRepository::new()),
            executor,
        )
    }

    pub fn with_parts(
        config: Config,
        fans: Arc<dyn FanRepository>,
        broadcasts: Arc<dyn BroadcastRepository>,
        executor: Arc<dyn DeliveryExecutor>,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let publisher = Arc::new(StatusPublisher::default());
        let dispatcher = Arc::new(Dispatcher::new(config.dispatcher_config(), executor));
        let orchestrator = Arc::new(BroadcastOrchestrator::new(
            IdempotencyGuard::new(broadcasts.clone()),
            registry.clone(),
            fans.clone(),
            dispatcher.clone(),
            publisher.clone(),
        ));

        Self {
            config: Arc::new(config),
            registry,
            fans,
            broadcasts,
            publisher,
            dispatcher,
            orchestrator,
        }
    }
}
