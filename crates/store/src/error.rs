use communis_types::CoreError;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => CoreError::NotFound(msg),
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            StoreError::InsufficientInventory {
                requested,
                available,
            } => CoreError::InsufficientInventory {
                requested,
                available,
            },
            StoreError::InvariantViolation(msg) => CoreError::Conflict(msg),
            StoreError::InvalidInput(msg) => CoreError::InvalidArgument(msg),
            StoreError::Backend(msg) => CoreError::Infrastructure(msg),
        }
    }
}
