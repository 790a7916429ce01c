//! Genetic search configuration

use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;

/// Tuning knobs for the genetic search over transfer percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    /// Chromosomes per generation
    pub population: usize,

    /// Fixed generation budget
    pub generations: usize,

    /// Probability each offspring gene is mutated
    pub mutation_rate: f64,

    /// Standard deviation of a mutation step, in percentage points
    pub mutation_std_dev: f64,

    /// Replace the population with random chromosomes every this many
    /// generations, keeping the best-ever chromosome. Zero disables reseeding.
    pub reseed_interval: usize,

    /// Seed for reproducible runs; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        GeneticConfig {
            population: 40,
            generations: 600,
            mutation_rate: 0.10,
            mutation_std_dev: 10.0,
            reseed_interval: 30,
            seed: None,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.population < 2 {
            return Err(OptimizeError::Config(format!(
                "population must be at least 2, got {}",
                self.population
            )));
        }
        if self.generations == 0 {
            return Err(OptimizeError::Config("generations must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(OptimizeError::Config(format!(
                "mutation rate must be within 0..=1, got {}",
                self.mutation_rate
            )));
        }
        if !self.mutation_std_dev.is_finite() || self.mutation_std_dev < 0.0 {
            return Err(OptimizeError::Config(format!(
                "mutation std dev must be a non-negative number, got {}",
                self.mutation_std_dev
            )));
        }
        Ok(())
    }
}
