//! # Sagaflow Checkpoint
//!
//! Durable execution engine for Sagaflow workflow runs.
//!
//! ## Features
//!
//! - Started / completed / failed checkpoints per run ID
//! - Completed runs return their stored output instead of running again
//! - Recovery of runs interrupted before they finished
//! - Memory and file backed checkpoint stores with per-run pruning

pub mod error;
pub mod checkpoint;
pub mod engine;
pub mod recovery;
pub mod store;

pub use error::CheckpointError;
pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointState};
pub use engine::CheckpointEngine;
pub use recovery::RecoveryManager;
pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, open_store};
