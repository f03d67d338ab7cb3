//! Data types shared across Sagaflow crates.

mod common;
mod workflow;
mod result;
mod progress;
mod template;

pub use common::*;
pub use workflow::*;
pub use result::*;
pub use progress::*;
pub use template::*;
