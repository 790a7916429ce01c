//! Per-account running totals.
//!
//! Every account owns a `MetricLedger`: one running total per `Metric`
//! label at month, year and lifetime granularity. The portfolio closes the
//! month (snapshot then reset) at each day-1 checkpoint and the year at
//! each January 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::money::Currency;

/// Label attached to a ledger total and to every account memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Opening,
    Closing,
    Raise,
    Drift,
    Growth,
    Dividend,
    Interest,
    EmployedIncome,
    SelfEmployedIncome,
    SocialSecurityIncome,
    NetIncome,
    Fica,
    IncomeTax,
    EstimatedTax,
    CapitalGainsTax,
    PreTaxContribution,
    Contribution,
    Distribution,
    Rmd,
    ShortTermGain,
    LongTermGain,
    MortgageInterest,
    MortgagePrincipal,
    PropertyTax,
    Expense,
    TransferIn,
    TransferOut,
}

impl Metric {
    pub const COUNT: usize = 27;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Opening,
        Metric::Closing,
        Metric::Raise,
        Metric::Drift,
        Metric::Growth,
        Metric::Dividend,
        Metric::Interest,
        Metric::EmployedIncome,
        Metric::SelfEmployedIncome,
        Metric::SocialSecurityIncome,
        Metric::NetIncome,
        Metric::Fica,
        Metric::IncomeTax,
        Metric::EstimatedTax,
        Metric::CapitalGainsTax,
        Metric::PreTaxContribution,
        Metric::Contribution,
        Metric::Distribution,
        Metric::Rmd,
        Metric::ShortTermGain,
        Metric::LongTermGain,
        Metric::MortgageInterest,
        Metric::MortgagePrincipal,
        Metric::PropertyTax,
        Metric::Expense,
        Metric::TransferIn,
        Metric::TransferOut,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One value per metric label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValues([Currency; Metric::COUNT]);

impl Default for MetricValues {
    fn default() -> Self {
        MetricValues([Currency::ZERO; Metric::COUNT])
    }
}

impl MetricValues {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Currency {
        self.0[metric.index()]
    }

    pub fn add(&mut self, metric: Metric, amount: Currency) {
        self.0[metric.index()] += amount;
    }

    pub fn clear(&mut self) {
        self.0 = [Currency::ZERO; Metric::COUNT];
    }

    /// Labels with a non-zero total.
    pub fn non_zero(&self) -> impl Iterator<Item = (Metric, Currency)> + '_ {
        Metric::ALL
            .iter()
            .map(|&m| (m, self.get(m)))
            .filter(|(_, v)| !v.is_zero())
    }
}

/// Running totals with monthly snapshot/reset semantics.
#[derive(Debug, Clone, Default)]
pub struct MetricLedger {
    month: MetricValues,
    last_month: MetricValues,
    year: MetricValues,
    lifetime: MetricValues,
}

impl MetricLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an amount under a label at every granularity.
    pub fn record(&mut self, metric: Metric, amount: Currency) {
        self.month.add(metric, amount);
        self.year.add(metric, amount);
        self.lifetime.add(metric, amount);
    }

    #[must_use]
    pub fn month(&self, metric: Metric) -> Currency {
        self.month.get(metric)
    }

    #[must_use]
    pub fn year(&self, metric: Metric) -> Currency {
        self.year.get(metric)
    }

    #[must_use]
    pub fn lifetime(&self, metric: Metric) -> Currency {
        self.lifetime.get(metric)
    }

    /// Totals of the most recently closed month.
    #[must_use]
    pub fn last_month(&self) -> &MetricValues {
        &self.last_month
    }

    #[must_use]
    pub fn year_values(&self) -> &MetricValues {
        &self.year
    }

    #[must_use]
    pub fn lifetime_values(&self) -> &MetricValues {
        &self.lifetime
    }

    /// Snapshot the current month and start a fresh one.
    pub fn close_month(&mut self) {
        self.last_month = self.month;
        self.month.clear();
    }

    pub fn close_year(&mut self) {
        self.year.clear();
    }

    pub fn reset(&mut self) {
        self.month.clear();
        self.last_month.clear();
        self.year.clear();
        self.lifetime.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_index_matches_all_table() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i, "{metric} out of order");
        }
    }

    #[test]
    fn test_close_month_snapshots_and_resets() {
        let mut ledger = MetricLedger::new();
        ledger.record(Metric::Growth, Currency::new(10.0));
        ledger.record(Metric::Growth, Currency::new(5.0));

        assert_eq!(ledger.month(Metric::Growth), Currency::new(15.0));
        ledger.close_month();

        assert_eq!(ledger.month(Metric::Growth), Currency::ZERO);
        assert_eq!(ledger.last_month().get(Metric::Growth), Currency::new(15.0));
        assert_eq!(ledger.year(Metric::Growth), Currency::new(15.0));
        assert_eq!(ledger.lifetime(Metric::Growth), Currency::new(15.0));
    }

    #[test]
    fn test_close_year_keeps_lifetime() {
        let mut ledger = MetricLedger::new();
        ledger.record(Metric::Fica, Currency::new(100.0));
        ledger.close_year();
        ledger.record(Metric::Fica, Currency::new(40.0));

        assert_eq!(ledger.year(Metric::Fica), Currency::new(40.0));
        assert_eq!(ledger.lifetime(Metric::Fica), Currency::new(140.0));
    }

    #[test]
    fn test_non_zero_filters_untouched_labels() {
        let mut values = MetricValues::default();
        values.add(Metric::Dividend, Currency::new(3.0));
        let labels: Vec<_> = values.non_zero().map(|(m, _)| m).collect();
        assert_eq!(labels, vec![Metric::Dividend]);
    }
}
