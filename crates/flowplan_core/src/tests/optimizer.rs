//! Tests for the genetic optimizer
//!
//! These tests verify:
//! - The search moves savings toward the growing account
//! - Best-ever fitness never decreases across generations
//! - Progress messages: one iteration per generation, completion last
//! - Consumer cancellation and configuration errors

use std::ops::ControlFlow;

use super::ym;
use crate::context::SimulationSettings;
use crate::error::OptimizeError;
use crate::model::{AccountSnapshot, Frequency, InstrumentKind};
use crate::optimization::{GeneticConfig, OptimizerMessage, optimize};

fn savings_plan() -> Vec<AccountSnapshot> {
    vec![
        AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2026, 12))
            .balance(5_000.0)
            .transfer("Brokerage", Frequency::Monthly, 6.0, 0.0),
        AccountSnapshot::new(InstrumentKind::Brokerage, "Brokerage", ym(2025, 1), ym(2026, 12)).rate(0.08),
        AccountSnapshot::new(InstrumentKind::Cash, "Cash", ym(2025, 1), ym(2026, 12)),
    ]
}

fn config() -> GeneticConfig {
    GeneticConfig {
        population: 20,
        generations: 40,
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn test_search_prefers_the_growing_account() {
    let mut messages = Vec::new();
    let result = optimize(&savings_plan(), SimulationSettings::default(), &config(), |message| {
        messages.push(message);
        ControlFlow::Continue(())
    })
    .unwrap();

    assert!(result.completed);
    assert_eq!(result.generations_run(), 40);
    assert_eq!(result.best_genes.len(), 1);
    assert!(result.best_genes[0] > 80.0, "best genes {:?}", result.best_genes);
    assert!(
        result
            .best_by_generation
            .windows(2)
            .all(|pair| pair[1] >= pair[0]),
        "best fitness decreased: {:?}",
        result.best_by_generation
    );
    assert_eq!(result.best_by_generation.last(), Some(&result.fitness));

    let job = result.best.iter().find(|s| s.name == "Job").unwrap();
    assert!((job.transfers[0].recurring_pct - result.best_genes[0]).abs() < 1e-9);

    let iterations: Vec<&str> = messages
        .iter()
        .filter_map(|m| match m {
            OptimizerMessage::Iteration { generation_label } => Some(generation_label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(iterations.len(), 40);
    assert_eq!(iterations[0], "1/40");
    assert_eq!(iterations[39], "40/40");
    assert!(
        messages
            .iter()
            .any(|m| matches!(m, OptimizerMessage::FoundBetter { .. }))
    );
    assert_eq!(
        messages.last(),
        Some(&OptimizerMessage::Complete {
            accounts: result.best.clone()
        })
    );
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        optimize(&savings_plan(), SimulationSettings::default(), &config(), |_| {
            ControlFlow::Continue(())
        })
        .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.best_genes, second.best_genes);
    assert_eq!(first.best_by_generation, second.best_by_generation);
}

#[test]
fn test_consumer_can_stop_the_search() {
    let mut complete_seen = false;
    let result = optimize(&savings_plan(), SimulationSettings::default(), &config(), |message| {
        match message {
            OptimizerMessage::Iteration { .. } => ControlFlow::Break(()),
            OptimizerMessage::Complete { .. } => {
                complete_seen = true;
                ControlFlow::Continue(())
            }
            OptimizerMessage::FoundBetter { .. } => ControlFlow::Continue(()),
        }
    })
    .unwrap();

    assert!(!result.completed);
    assert_eq!(result.generations_run(), 1);
    assert!(!complete_seen);
    assert_eq!(result.best.len(), 3);
}

#[test]
fn test_nothing_to_tune_is_an_error() {
    let snapshots = [
        AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2025, 12)).balance(5_000.0),
        AccountSnapshot::new(InstrumentKind::Cash, "Cash", ym(2025, 1), ym(2025, 12)),
    ];
    let result = optimize(&snapshots, SimulationSettings::default(), &config(), |_| {
        ControlFlow::Continue(())
    });
    assert_eq!(result, Err(OptimizeError::NoGenes));
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let bad = GeneticConfig {
        generations: 0,
        ..config()
    };
    let mut called = false;
    let result = optimize(&savings_plan(), SimulationSettings::default(), &bad, |_| {
        called = true;
        ControlFlow::Continue(())
    });
    assert!(matches!(result, Err(OptimizeError::Config(_))));
    assert!(!called);

    let empty = optimize(&[], SimulationSettings::default(), &config(), |_| ControlFlow::Continue(()));
    assert!(matches!(empty, Err(OptimizeError::Run(_))));
}
