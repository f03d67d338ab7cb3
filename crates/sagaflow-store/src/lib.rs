//! # Sagaflow Store
//!
//! [`WorkflowStore`](sagaflow_protocols::WorkflowStore) implementations.
//!
//! - [`MemoryWorkflowStore`] - process-local maps, for tests and dry runs
//! - [`SqliteWorkflowStore`] - SQLite database, survives restarts

mod memory;
mod sqlite;

pub use memory::MemoryWorkflowStore;
pub use sqlite::SqliteWorkflowStore;

#[cfg(test)]
mod conformance;
