//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Rule store, identity provider or session store could not be reached
    #[error("Authorization store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error (session-scoped permission lists)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Whether the error means the decision could not be computed, as
    /// opposed to a caller mistake.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;
