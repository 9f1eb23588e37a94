use thiserror::Error;

use crate::db::RepositoryError;

/// Why a dispatcher submission or wait did not produce a result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The queue stayed full for the whole submission window.
    #[error("timed out waiting for a queue slot")]
    QueueTimeout,

    /// The job was queued but its result did not arrive in time.
    #[error("timed out waiting for job completion")]
    CompletionTimeout,

    #[error("wait cancelled by caller")]
    Cancelled,

    #[error("dispatcher is shut down")]
    Closed,

    /// The completion handle was dropped without a result.
    #[error("job was dropped before reporting a result")]
    Abandoned,
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dependency failure: {0}")]
    Dependency(#[from] RepositoryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
