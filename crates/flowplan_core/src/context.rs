//! Explicit per-run configuration
//!
//! The tax table, inflation rate, filing status and user age live in a
//! `SimulationContext` built once per run and owned by one portfolio.
//! Optimizer candidates each get their own copy.

use serde::{Deserialize, Serialize};

use crate::history::{Backtest, HistoricalReturnTable};
use crate::taxes::{FilingStatus, TaxTable};

/// Caller-supplied run settings, persisted next to the account snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub filing_status: FilingStatus,
    /// Age of the user during the first simulated year.
    pub age: u8,
    /// Used instead of `age` when set: age = first simulated year - birth year.
    pub birth_year: Option<u16>,
    /// Yearly inflation applied to the tax table.
    pub inflation_rate: f64,
    /// Map the first simulated year onto this historical year and follow
    /// historical returns from there.
    pub backtest_from: Option<u16>,
    /// Record monthly and yearly period reports.
    pub capture_reports: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            filing_status: FilingStatus::Single,
            age: 40,
            birth_year: None,
            inflation_rate: 0.03,
            backtest_from: None,
            capture_reports: false,
        }
    }
}

impl SimulationSettings {
    #[must_use]
    pub fn age_in(&self, year: u16) -> u8 {
        match self.birth_year {
            Some(birth) => u8::try_from(year.saturating_sub(birth)).unwrap_or(u8::MAX),
            None => self.age,
        }
    }
}

/// Aging user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub age: u8,
}

impl UserContext {
    pub fn age_one_year(&mut self) {
        self.age = self.age.saturating_add(1);
    }
}

/// Everything a run needs besides the accounts themselves.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub settings: SimulationSettings,
    pub tax: TaxTable,
    pub user: UserContext,
    /// Inflation for the current simulated year (historical CPI in backtests).
    pub inflation: f64,
    pub backtest: Option<Backtest>,
}

impl SimulationContext {
    #[must_use]
    pub fn new(settings: SimulationSettings, first_year: u16) -> Self {
        let backtest = settings.backtest_from.map(|from_year| Backtest {
            table: HistoricalReturnTable::us_historical(),
            from_year,
            first_simulated_year: first_year,
        });
        SimulationContext {
            tax: TaxTable::us_federal_2024(settings.filing_status),
            user: UserContext {
                age: settings.age_in(first_year),
            },
            inflation: settings.inflation_rate,
            backtest,
            settings,
        }
    }

    /// Rebuild the mutable parts for a fresh run, keeping settings and any
    /// backtest table.
    pub fn reset(&mut self, first_year: u16) {
        self.tax = TaxTable::us_federal_2024(self.settings.filing_status);
        self.user = UserContext {
            age: self.settings.age_in(first_year),
        };
        self.inflation = self.settings.inflation_rate;
        match (&mut self.backtest, self.settings.backtest_from) {
            (Some(backtest), Some(from_year)) => {
                backtest.from_year = from_year;
                backtest.first_simulated_year = first_year;
            }
            (None, Some(from_year)) => {
                self.backtest = Some(Backtest {
                    table: HistoricalReturnTable::us_historical(),
                    from_year,
                    first_simulated_year: first_year,
                });
            }
            (_, None) => self.backtest = None,
        }
    }

    #[must_use]
    pub fn rmd_eligible(&self) -> bool {
        self.tax.rmd_eligible(self.user.age)
    }
}
