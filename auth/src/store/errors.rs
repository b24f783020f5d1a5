use thiserror::Error;

/// Error for user store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("User store unavailable: {0}")]
    Unavailable(String),

    #[error("User store error: {0}")]
    Backend(String),
}
