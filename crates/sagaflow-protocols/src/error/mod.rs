//! Error types for the Sagaflow protocol layer.

mod step;
mod agent;
mod compensation;
mod registry;
mod template;
mod store;
mod engine;

pub use step::*;
pub use agent::*;
pub use compensation::*;
pub use registry::*;
pub use template::*;
pub use store::*;
pub use engine::*;
