//! Portfolio cash-flow simulation library
//!
//! This crate provides a deterministic, month-by-month engine for personal
//! finance planning. It supports:
//! - Thirteen instrument kinds (salary, social security, cash, savings,
//!   brokerage, IRAs, employer plans, Roth, bonds, home, mortgage, debt,
//!   recurring expenses) with per-kind monthly and yearly behavior
//! - Name-bound fund-transfer rules with recurring and on-close percentages
//! - US federal income, long-term gains and FICA taxes, contribution limits
//!   and required minimum distributions
//! - Historical backtests over built-in S&P 500, bond and CPI series
//! - A genetic optimizer over transfer percentages
//!
//! # Example
//!
//! ```ignore
//! use flowplan_core::{AccountSnapshot, Frequency, InstrumentKind, Portfolio, SimulationSettings, YearMonth};
//! use flowplan_core::run_chronometer;
//!
//! let snapshots = vec![
//!     AccountSnapshot::new(InstrumentKind::Salary, "Job", YearMonth::new(2025, 1), YearMonth::new(2054, 12))
//!         .balance(8_000.0)
//!         .rate(0.03)
//!         .transfer("Brokerage", Frequency::Monthly, 15.0, 0.0),
//!     AccountSnapshot::new(InstrumentKind::Brokerage, "Brokerage", YearMonth::new(2025, 1), YearMonth::new(2054, 12))
//!         .rate(0.07),
//!     AccountSnapshot::new(InstrumentKind::Cash, "Checking", YearMonth::new(2025, 1), YearMonth::new(2054, 12)),
//! ];
//! let mut portfolio = Portfolio::new(SimulationSettings::default(), &snapshots)?;
//! let summary = run_chronometer(&mut portfolio)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod account;
pub mod chronometer;
pub mod optimization;
pub mod portfolio;
pub mod reconcile;
pub mod taxes;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod calendar;
pub mod context;
pub mod error;
pub mod history;
pub mod metrics;
pub mod model;
pub mod money;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use account::Account;
pub use calendar::{CalendarPoint, Checkpoint, YearMonth};
pub use chronometer::{RunSummary, run_chronometer};
pub use context::{SimulationContext, SimulationSettings};
pub use error::{OptimizeError, RunError, SnapshotError};
pub use model::{AccountSnapshot, Frequency, InstrumentKind, PeriodReport, PeriodTotals, TransferSnapshot};
pub use money::{AnnualRate, Currency};
pub use portfolio::Portfolio;
pub use taxes::{FilingStatus, LimitGroup, TaxTable};
