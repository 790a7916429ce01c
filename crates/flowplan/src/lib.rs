//! Command-line front end for the flowplan simulation engine
//!
//! This crate wraps `flowplan_core` with:
//! - YAML portfolio files and a per-user data directory
//! - Logging to a size-capped file or stderr
//! - A background thread that runs the genetic optimizer
//! - Text and JSON reports

// ============================================================================
// Modules
// ============================================================================

pub mod commands;
pub mod example;
pub mod logging;
pub mod report;
pub mod storage;
pub mod worker;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use logging::{LogTarget, init_logging};
pub use report::{OutputFormat, RunReport};
pub use storage::{DataDirectory, PortfolioFile, StorageError};
pub use worker::{OptimizeRequest, OptimizerWorker, WorkerResponse};
