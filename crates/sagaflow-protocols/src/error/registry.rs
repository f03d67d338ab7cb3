//! Registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown agent type: {0}")]
    NotFound(String),
}
