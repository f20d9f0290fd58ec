use thiserror::Error;

/// Errors raised by the pure-math core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A vector or coordinate had the wrong number of components.
    #[error("input shape mismatch: expected {expected} components, got {actual}")]
    InputShape { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
