//! Genetic search over recurring transfer percentages
//!
//! Each generation is scored by re-running the chronometer once per
//! chromosome. The top half survives as parents; the rest of the population
//! is refilled with single-point crossovers, each gene mutated with
//! probability `mutation_rate` by a normal step and clamped to 0..=100.
//! Every `reseed_interval` generations the population is replaced by random
//! chromosomes plus the best one found so far.

use std::ops::ControlFlow;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

use crate::context::SimulationSettings;
use crate::error::{OptimizeError, RunError};
use crate::model::AccountSnapshot;
use crate::portfolio::Portfolio;

use super::config::GeneticConfig;
use super::evaluator::Evaluator;
use super::result::{OptimizationResult, OptimizerMessage};

const MAX_PCT: f64 = 100.0;

fn random_chromosome<R: Rng + ?Sized>(rng: &mut R, genes: usize) -> Vec<f64> {
    (0..genes).map(|_| rng.random_range(0.0..=MAX_PCT)).collect()
}

/// Single-point crossover: genes before the cut come from `a`, the rest from `b`.
fn crossover<R: Rng + ?Sized>(rng: &mut R, a: &[f64], b: &[f64]) -> Vec<f64> {
    let cut = rng.random_range(0..=a.len());
    a[..cut].iter().chain(&b[cut..]).copied().collect()
}

fn mutate<R: Rng + ?Sized>(rng: &mut R, genes: &mut [f64], rate: f64, step: &Normal<f64>) {
    for gene in genes.iter_mut() {
        if rng.random_bool(rate) {
            *gene = (*gene + step.sample(rng)).clamp(0.0, MAX_PCT);
        }
    }
}

/// Indices of `scores` from best to worst.
fn ranking(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// Search for the transfer percentages that maximize terminal value.
///
/// `emit` receives an `Iteration` message per generation and a
/// `FoundBetter` message per new best-ever chromosome; returning
/// `ControlFlow::Break` stops the search, in which case no `Complete`
/// message is sent and the result is marked incomplete.
pub fn optimize<F>(
    snapshots: &[AccountSnapshot],
    settings: SimulationSettings,
    config: &GeneticConfig,
    mut emit: F,
) -> Result<OptimizationResult, OptimizeError>
where
    F: FnMut(OptimizerMessage) -> ControlFlow<()>,
{
    config.validate()?;
    let portfolio = Portfolio::new(settings, snapshots)?;
    if portfolio.is_empty() {
        return Err(RunError::NoAccounts.into());
    }
    if portfolio.period().is_none() {
        return Err(RunError::UnresolvedPeriod.into());
    }
    let evaluator = Evaluator::new(portfolio)?;
    let step = Normal::new(0.0, config.mutation_std_dev)
        .map_err(|e| OptimizeError::Config(e.to_string()))?;

    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let genes = evaluator.gene_count();
    let size = config.population;
    let parents = size.div_ceil(2);
    info!(genes, population = size, generations = config.generations, "optimizer starting");

    // the configured percentages compete from the start
    let mut population: Vec<Vec<f64>> = std::iter::once(evaluator.initial_chromosome())
        .chain((1..size).map(|_| random_chromosome(&mut rng, genes)))
        .collect();

    let mut best_genes = population[0].clone();
    let mut best_fitness = f64::NEG_INFINITY;
    let mut best_by_generation = Vec::with_capacity(config.generations);
    let mut completed = true;

    for generation in 0..config.generations {
        if generation > 0 && config.reseed_interval > 0 && generation % config.reseed_interval == 0 {
            population[0].clone_from(&best_genes);
            for chromosome in population.iter_mut().skip(1) {
                *chromosome = random_chromosome(&mut rng, genes);
            }
            debug!(generation, "population reseeded");
        }

        let scores = evaluator.evaluate_population(&population);
        let order = ranking(&scores);
        let leader = order[0];
        let mut stop = false;

        if scores[leader] > best_fitness {
            best_fitness = scores[leader];
            best_genes.clone_from(&population[leader]);
            debug!(generation, fitness = best_fitness, genes = ?best_genes, "found better chromosome");
            let accounts = evaluator.snapshots_for(&best_genes);
            stop = emit(OptimizerMessage::FoundBetter { accounts }).is_break();
        }
        best_by_generation.push(best_fitness);

        if !stop {
            let generation_label = format!("{}/{}", generation + 1, config.generations);
            stop = emit(OptimizerMessage::Iteration { generation_label }).is_break();
        }
        if stop {
            info!(generation, "optimizer stopped by consumer");
            completed = false;
            break;
        }

        let mut next: Vec<Vec<f64>> = order[..parents].iter().map(|&i| population[i].clone()).collect();
        while next.len() < size {
            let a = &next[rng.random_range(0..parents)];
            let b = &next[rng.random_range(0..parents)];
            let mut child = crossover(&mut rng, a, b);
            mutate(&mut rng, &mut child, config.mutation_rate, &step);
            next.push(child);
        }
        population = next;
    }

    let best = evaluator.snapshots_for(&best_genes);
    if completed {
        info!(fitness = best_fitness, "optimizer complete");
        // the consumer may already be gone; nothing left to stop
        let _ = emit(OptimizerMessage::Complete {
            accounts: best.clone(),
        });
    }

    Ok(OptimizationResult {
        best,
        best_genes,
        fitness: best_fitness,
        best_by_generation,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossover_takes_prefix_and_suffix() {
        let mut rng = SmallRng::seed_from_u64(7);
        let a = [1.0, 1.0, 1.0, 1.0];
        let b = [2.0, 2.0, 2.0, 2.0];
        for _ in 0..20 {
            let child = crossover(&mut rng, &a, &b);
            assert_eq!(child.len(), 4);
            let cut = child.iter().take_while(|&&g| g == 1.0).count();
            assert!(child[cut..].iter().all(|&g| g == 2.0));
        }
    }

    #[test]
    fn test_mutation_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(11);
        let step = Normal::new(0.0, 80.0).unwrap();
        let mut genes = vec![0.0, 50.0, 100.0];
        for _ in 0..100 {
            mutate(&mut rng, &mut genes, 1.0, &step);
            assert!(genes.iter().all(|g| (0.0..=MAX_PCT).contains(g)));
        }
    }

    #[test]
    fn test_ranking_is_descending() {
        assert_eq!(ranking(&[3.0, 9.0, f64::NEG_INFINITY, 5.0]), vec![1, 3, 0, 2]);
    }
}
