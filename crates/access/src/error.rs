use communis_types::CoreError;
use thiserror::Error;

/// Result type for collaborator calls.
pub type AccessResult<T> = Result<T, AccessError>;

/// Failures of an external collaborator.
///
/// Both variants are retryable infrastructure conditions. A timeout is never
/// interpreted as "permission denied" or "item missing".
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator call timed out: {0}")]
    Timeout(String),
}

impl From<AccessError> for CoreError {
    fn from(err: AccessError) -> Self {
        CoreError::Infrastructure(err.to_string())
    }
}
