use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Backtest cancelled")]
    Cancelled,

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Hedge order failures reported by the execution gateway.
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Order timed out after {0}ms")]
    Timeout(u64),

    #[error("Connectivity error: {0}")]
    Connectivity(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
