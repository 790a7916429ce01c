//! Integration tests for the flowplan simulation engine
//!
//! Tests are organized by topic:
//! - `accounts` - Credit/debit, basis and gain recognition, closures
//! - `taxes` - Bracket properties, withholding, RMDs, contribution limits
//! - `portfolio` - Transfer routing, shortfalls, month identity, reports
//! - `chronometer` - End-to-end runs, amortization, backtests
//! - `optimizer` - Genetic search convergence and cancellation

mod accounts;
mod optimizer;
mod taxes;

use crate::calendar::{CalendarPoint, Checkpoint, YearMonth};
use crate::chronometer::advance;
use crate::context::SimulationSettings;
use crate::model::AccountSnapshot;
use crate::portfolio::Portfolio;

pub(crate) fn ym(year: u16, month: u8) -> YearMonth {
    YearMonth::new(year, month)
}

pub(crate) fn build(snapshots: &[AccountSnapshot]) -> Portfolio {
    build_with(SimulationSettings::default(), snapshots)
}

pub(crate) fn build_with(settings: SimulationSettings, snapshots: &[AccountSnapshot]) -> Portfolio {
    Portfolio::new(settings, snapshots).expect("valid snapshots")
}

/// Drive the portfolio through the chronometer's per-checkpoint step,
/// calling `after_month` after every day-30 settlement.
pub(crate) fn step_months(portfolio: &mut Portfolio, mut after_month: impl FnMut(&Portfolio, CalendarPoint)) {
    let (first, last) = portfolio.period().expect("resolvable period");
    portfolio.initialize();
    let mut point = first;
    while point <= last {
        if advance(portfolio, point, first) == Some(Checkpoint::EndOfMonth) {
            after_month(portfolio, point);
        }
        point = point.next_checkpoint();
    }
    portfolio.finish_run(last);
}

pub(crate) fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{what}: expected {expected}, got {actual}"
    );
}
