//! Persistence collaborators the dispatch engine calls.
//!
//! Durable storage lives outside this crate; the in-memory implementations
//! back the single-process deployment and the tests.

pub mod broadcasts;
pub mod fans;

use thiserror::Error;

pub use broadcasts::{BroadcastRepository, MemoryBroadcastRepository};
pub use fans::{FanRepository, MemoryFanRepository};

/// Failure reported by a repository implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
