//! The broadcast dispatch engine.

pub mod dispatcher;
pub mod error;
pub mod idempotency;
pub mod orchestrator;
pub mod registry;
pub mod types;

pub use dispatcher::{BroadcastJob, Dispatcher, DispatcherConfig, PendingJob};
pub use error::{BroadcastError, DispatchError};
pub use idempotency::{GuardDecision, IdempotencyGuard};
pub use orchestrator::{BroadcastOrchestrator, BroadcastOutcome};
pub use registry::SubscriptionRegistry;
