//! Compensation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompensationError {
    #[error("No compensation handler registered for kind: {0}")]
    NoHandler(String),

    #[error("Invalid compensation parameters: {0}")]
    InvalidParams(String),

    #[error("Compensation failed: {0}")]
    Failed(String),
}
