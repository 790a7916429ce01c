//! Transfer-percentage optimization
//!
//! A genetic search that tunes the recurring percentages of transfer rules
//! on income and expense accounts to maximize terminal net worth. It only
//! consumes and produces `AccountSnapshot`s, so it can run behind a thread
//! or process boundary.
//!
//! # Example
//!
//! ```ignore
//! use std::ops::ControlFlow;
//! use flowplan_core::optimization::{GeneticConfig, OptimizerMessage, optimize};
//!
//! let config = GeneticConfig { generations: 100, seed: Some(7), ..Default::default() };
//! let result = optimize(&snapshots, settings, &config, |message| {
//!     if let OptimizerMessage::Iteration { generation_label } = &message {
//!         println!("generation {generation_label}");
//!     }
//!     ControlFlow::Continue(())
//! })?;
//! println!("best terminal value: {:.0}", result.fitness);
//! ```

mod config;
mod evaluator;
mod genetic;
mod result;

pub use config::GeneticConfig;
pub use evaluator::{Evaluator, GeneSlot, gene_slots};
pub use genetic::optimize;
pub use result::{OptimizationResult, OptimizerMessage};
