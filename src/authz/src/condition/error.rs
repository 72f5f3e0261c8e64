//! Error types for condition operations

use thiserror::Error;

/// Condition compilation and evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Condition compilation failed: {0}")]
    CompilationError(String),

    #[error("Condition evaluation failed: {0}")]
    EvaluationError(String),

    #[error("Unsupported attribute value for `{0}`")]
    UnsupportedValue(String),

    #[error("Empty condition expression")]
    Empty,
}

/// Result type for condition operations
pub type Result<T> = std::result::Result<T, ConditionError>;
