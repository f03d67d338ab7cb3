//! # Sagaflow Config
//!
//! Configuration management for Sagaflow: TOML schema, a loader with
//! `${VAR}` expansion, and a validator.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
