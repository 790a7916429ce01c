//! Optimizer output and progress messages

use serde::{Deserialize, Serialize};

use crate::model::AccountSnapshot;

/// Progress sent across the optimizer boundary. Only reference-free
/// snapshots travel in these messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OptimizerMessage {
    /// One generation finished, e.g. `"17/600"`.
    Iteration {
        #[serde(rename = "generationLabel")]
        generation_label: String,
    },
    /// A new best-ever chromosome, applied to the accounts.
    FoundBetter { accounts: Vec<AccountSnapshot> },
    /// The generation budget is spent; carries the best accounts found.
    Complete { accounts: Vec<AccountSnapshot> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Accounts with the best chromosome applied
    pub best: Vec<AccountSnapshot>,

    /// Best chromosome, one percentage per tunable rule
    pub best_genes: Vec<f64>,

    /// Terminal value reached by `best`
    pub fitness: f64,

    /// Best-ever fitness after each generation (non-decreasing)
    pub best_by_generation: Vec<f64>,

    /// False when the consumer stopped the search early
    pub completed: bool,
}

impl OptimizationResult {
    #[must_use]
    pub fn generations_run(&self) -> usize {
        self.best_by_generation.len()
    }
}
