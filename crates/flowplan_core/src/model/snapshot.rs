//! Reference-free account records
//!
//! `AccountSnapshot` is what gets persisted, shared, and sent to the
//! optimizer worker. It never carries runtime state or bound references, so
//! it is safe to serialize as often as needed.

use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::error::SnapshotError;
use crate::money::{AnnualRate, Currency};

use super::kind::InstrumentKind;
use super::transfer::{Frequency, TransferSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub kind: InstrumentKind,
    pub name: String,
    pub start: YearMonth,
    pub finish: YearMonth,
    /// Liabilities and expenses may be given as positive amounts; the engine
    /// stores them negative.
    #[serde(default)]
    pub starting_balance: Currency,
    #[serde(default)]
    pub starting_basis: Currency,
    /// Growth, interest, raise, or cost-inflation rate depending on kind.
    #[serde(default)]
    pub rate: AnnualRate,
    #[serde(default)]
    pub dividend_rate: AnnualRate,
    /// Flat estimated-tax rate for capital accounts; property-tax rate for homes.
    #[serde(default)]
    pub tax_rate: AnnualRate,
    /// Remaining amortization term in months.
    #[serde(default)]
    pub term_months: u32,
    #[serde(default)]
    pub self_employed: bool,
    #[serde(default)]
    pub transfers: Vec<TransferSnapshot>,
}

impl AccountSnapshot {
    #[must_use]
    pub fn new(kind: InstrumentKind, name: impl Into<String>, start: YearMonth, finish: YearMonth) -> Self {
        AccountSnapshot {
            kind,
            name: name.into(),
            start,
            finish,
            starting_balance: Currency::ZERO,
            starting_basis: Currency::ZERO,
            rate: AnnualRate::ZERO,
            dividend_rate: AnnualRate::ZERO,
            tax_rate: AnnualRate::ZERO,
            term_months: 0,
            self_employed: false,
            transfers: Vec::new(),
        }
    }

    #[must_use]
    pub fn balance(mut self, amount: f64) -> Self {
        self.starting_balance = Currency::new(amount);
        self
    }

    #[must_use]
    pub fn basis(mut self, amount: f64) -> Self {
        self.starting_basis = Currency::new(amount);
        self
    }

    #[must_use]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = AnnualRate::new(rate);
        self
    }

    #[must_use]
    pub fn dividend_rate(mut self, rate: f64) -> Self {
        self.dividend_rate = AnnualRate::new(rate);
        self
    }

    #[must_use]
    pub fn tax_rate(mut self, rate: f64) -> Self {
        self.tax_rate = AnnualRate::new(rate);
        self
    }

    #[must_use]
    pub fn term(mut self, months: u32) -> Self {
        self.term_months = months;
        self
    }

    #[must_use]
    pub fn self_employed(mut self, self_employed: bool) -> Self {
        self.self_employed = self_employed;
        self
    }

    #[must_use]
    pub fn transfer(
        mut self,
        target: impl Into<String>,
        frequency: Frequency,
        recurring_pct: f64,
        on_close_pct: f64,
    ) -> Self {
        self.transfers.push(TransferSnapshot {
            target: target.into(),
            frequency,
            recurring_pct,
            on_close_pct,
        });
        self
    }

    /// Check the window and name. Transfer targets are resolved later and an
    /// unknown target is not an error.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.name.trim().is_empty() {
            return Err(SnapshotError::EmptyName);
        }
        if !self.start.is_valid() || !self.finish.is_valid() {
            return Err(SnapshotError::InvalidWindow {
                name: self.name.clone(),
                start: self.start,
                finish: self.finish,
            });
        }
        if self.finish < self.start {
            return Err(SnapshotError::InvalidWindow {
                name: self.name.clone(),
                start: self.start,
                finish: self.finish,
            });
        }
        if self.kind.behavior() == super::kind::Behavior::Amortizing && self.term_months == 0 {
            return Err(SnapshotError::MissingTerm(self.name.clone()));
        }
        Ok(())
    }
}
