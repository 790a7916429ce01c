//! Chromosome application and fitness evaluation
//!
//! A chromosome is one recurring percentage per tunable transfer rule. Each
//! evaluation writes the genes into a scratch portfolio and re-runs the
//! chronometer on it; `run_chronometer` re-initializes the scratch copy, so
//! it is reused across evaluations instead of rebuilt.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::chronometer::run_chronometer;
use crate::error::OptimizeError;
use crate::model::{AccountIndex, AccountSnapshot, Behavior, Frequency};
use crate::portfolio::Portfolio;

/// Location of one tunable rule inside the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneSlot {
    pub account: AccountIndex,
    pub rule: usize,
}

/// Recurring rules on income and expense accounts are tunable.
#[must_use]
pub fn gene_slots(portfolio: &Portfolio) -> Vec<GeneSlot> {
    let mut slots = Vec::new();
    for (i, account) in portfolio.accounts().iter().enumerate() {
        if !matches!(
            account.kind().behavior(),
            Behavior::RecurringIncome | Behavior::RecurringExpense
        ) {
            continue;
        }
        for (r, rule) in account.transfers().iter().enumerate() {
            if rule.frequency() != Frequency::None {
                slots.push(GeneSlot {
                    account: AccountIndex(i),
                    rule: r,
                });
            }
        }
    }
    slots
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    base: Portfolio,
    slots: Vec<GeneSlot>,
}

impl Evaluator {
    pub fn new(mut base: Portfolio) -> Result<Self, OptimizeError> {
        let slots = gene_slots(&base);
        if slots.is_empty() {
            return Err(OptimizeError::NoGenes);
        }
        base.set_capture_reports(false);
        Ok(Evaluator { base, slots })
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[GeneSlot] {
        &self.slots
    }

    /// Percentages as configured in the starting portfolio.
    #[must_use]
    pub fn initial_chromosome(&self) -> Vec<f64> {
        self.slots
            .iter()
            .map(|slot| self.base.accounts()[slot.account.0].transfers()[slot.rule].recurring_pct())
            .collect()
    }

    /// Write genes into the matching rules.
    pub fn apply(&self, candidate: &mut Portfolio, genes: &[f64]) {
        for (slot, &pct) in self.slots.iter().zip(genes) {
            candidate.accounts_mut()[slot.account.0].transfers_mut()[slot.rule].set_recurring_pct(pct);
        }
    }

    /// Terminal value of one chromosome, using `scratch` as the run copy.
    /// A run that cannot start scores negative infinity.
    pub fn fitness_with(&self, scratch: &mut Portfolio, genes: &[f64]) -> f64 {
        self.apply(scratch, genes);
        match run_chronometer(scratch) {
            Ok(summary) => summary.terminal_value.amount(),
            Err(_) => f64::NEG_INFINITY,
        }
    }

    #[must_use]
    pub fn fitness(&self, genes: &[f64]) -> f64 {
        let mut scratch = self.base.clone();
        self.fitness_with(&mut scratch, genes)
    }

    /// Run one chromosome and return the resulting snapshots, with any
    /// over-allocation already scaled back.
    #[must_use]
    pub fn snapshots_for(&self, genes: &[f64]) -> Vec<AccountSnapshot> {
        let mut candidate = self.base.clone();
        self.fitness_with(&mut candidate, genes);
        candidate.snapshots()
    }

    /// Fitness for every chromosome, in order.
    #[must_use]
    pub fn evaluate_population(&self, population: &[Vec<f64>]) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        let scores: Vec<f64> = population
            .par_iter()
            .map_init(|| self.base.clone(), |scratch, genes| self.fitness_with(scratch, genes))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let scores: Vec<f64> = {
            let mut scratch = self.base.clone();
            population
                .iter()
                .map(|genes| self.fitness_with(&mut scratch, genes))
                .collect()
        };

        scores
    }
}
