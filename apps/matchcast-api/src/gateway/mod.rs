pub mod events;
pub mod publisher;
pub mod server;

pub use publisher::{ObserverError, ObserverSink, StatusPublisher};
