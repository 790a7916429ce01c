//! Fund-transfer rules
//!
//! A rule names its target account; the live index is only filled in by
//! `bind` against the portfolio's registry at run start. Nothing persisted or
//! sent across the optimizer boundary carries the bound index.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::money::Currency;

use super::ids::AccountIndex;

/// Tolerance for percentage sums.
pub const PERCENT_EPSILON: f64 = 1e-9;

/// How often a recurring rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    None,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Frequency {
    /// Whether the rule fires in the given calendar month (1-12).
    #[must_use]
    pub fn is_due(self, month: u8) -> bool {
        match self {
            Frequency::None => false,
            Frequency::Monthly => true,
            Frequency::Quarterly => matches!(month, 1 | 4 | 7 | 10),
            Frequency::HalfYearly => matches!(month, 1 | 7),
            Frequency::Yearly => month == 1,
        }
    }
}

/// Serialized form of a rule: target name and percentages only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub target: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub recurring_pct: f64,
    #[serde(default)]
    pub on_close_pct: f64,
}

/// Runtime transfer rule owned by its source account.
#[derive(Debug, Clone, PartialEq)]
pub struct FundTransferRule {
    target: String,
    frequency: Frequency,
    recurring_pct: f64,
    on_close_pct: f64,
    cap: Option<Currency>,
    bound: Option<AccountIndex>,
}

impl FundTransferRule {
    /// Negative or non-finite percentages are clamped to zero.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        frequency: Frequency,
        recurring_pct: f64,
        on_close_pct: f64,
    ) -> Self {
        FundTransferRule {
            target: target.into(),
            frequency,
            recurring_pct: sanitize_pct(recurring_pct),
            on_close_pct: sanitize_pct(on_close_pct),
            cap: None,
            bound: None,
        }
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &TransferSnapshot) -> Self {
        Self::new(
            snapshot.target.clone(),
            snapshot.frequency,
            snapshot.recurring_pct,
            snapshot.on_close_pct,
        )
    }

    #[must_use]
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            target: self.target.clone(),
            frequency: self.frequency,
            recurring_pct: self.recurring_pct,
            on_close_pct: self.on_close_pct,
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    #[must_use]
    pub fn recurring_pct(&self) -> f64 {
        self.recurring_pct
    }

    #[must_use]
    pub fn on_close_pct(&self) -> f64 {
        self.on_close_pct
    }

    pub fn set_recurring_pct(&mut self, pct: f64) {
        self.recurring_pct = sanitize_pct(pct);
    }

    #[must_use]
    pub fn cap(&self) -> Option<Currency> {
        self.cap
    }

    /// Impose an upper bound on a single recurring transfer (contribution limits).
    pub fn set_cap(&mut self, cap: Option<Currency>) {
        self.cap = cap.map(Currency::positive_part);
    }

    #[must_use]
    pub fn bound(&self) -> Option<AccountIndex> {
        self.bound
    }

    /// Resolve the target name against the registry. Returns false when the
    /// target does not exist; the rule then stays unbound and moves nothing.
    pub fn bind(&mut self, registry: &FxHashMap<String, AccountIndex>) -> bool {
        self.bound = registry.get(&self.target).copied();
        self.bound.is_some()
    }

    pub fn unbind(&mut self) {
        self.bound = None;
    }

    /// Active recurring rules take part in allocation and scaling.
    #[must_use]
    pub fn is_active_recurring(&self) -> bool {
        self.frequency != Frequency::None && self.recurring_pct > 0.0
    }

    /// Amount this rule moves out of `base` in `month`, after the cap.
    /// Unbound rules and rules not due this month move nothing.
    #[must_use]
    pub fn recurring_amount(&self, base: Currency, month: u8) -> Currency {
        if self.bound.is_none() || !self.frequency.is_due(month) {
            return Currency::ZERO;
        }
        let amount = (base * (self.recurring_pct / 100.0)).positive_part();
        match self.cap {
            Some(cap) => amount.min(cap),
            None => amount,
        }
    }

    /// Amount this rule moves out of closing proceeds.
    #[must_use]
    pub fn on_close_amount(&self, proceeds: Currency) -> Currency {
        if self.bound.is_none() {
            return Currency::ZERO;
        }
        (proceeds * (self.on_close_pct / 100.0)).positive_part()
    }
}

fn sanitize_pct(pct: f64) -> f64 {
    if pct.is_finite() { pct.max(0.0) } else { 0.0 }
}

/// Sum of active recurring percentages.
#[must_use]
pub fn recurring_total(rules: &[FundTransferRule]) -> f64 {
    rules
        .iter()
        .filter(|r| r.is_active_recurring())
        .map(|r| r.recurring_pct)
        .sum()
}

/// Scale active recurring percentages down to exactly 100 when they exceed
/// it, preserving their ratios. Returns true when scaling happened.
pub fn clamp_recurring(rules: &mut [FundTransferRule]) -> bool {
    let total = recurring_total(rules);
    if total <= 100.0 + PERCENT_EPSILON {
        return false;
    }
    let scale = 100.0 / total;
    for rule in rules.iter_mut().filter(|r| r.is_active_recurring()) {
        rule.recurring_pct *= scale;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FxHashMap<String, AccountIndex> {
        FxHashMap::from_iter([
            ("Cash".to_string(), AccountIndex(0)),
            ("Brokerage".to_string(), AccountIndex(1)),
        ])
    }

    #[test]
    fn test_negative_percentages_clamped() {
        let rule = FundTransferRule::new("Cash", Frequency::Monthly, -5.0, f64::NAN);
        assert_eq!(rule.recurring_pct(), 0.0);
        assert_eq!(rule.on_close_pct(), 0.0);
    }

    #[test]
    fn test_unbound_rule_moves_nothing() {
        let mut rule = FundTransferRule::new("Nowhere", Frequency::Monthly, 50.0, 100.0);
        assert!(!rule.bind(&registry()));
        assert_eq!(rule.recurring_amount(Currency::new(1_000.0), 1), Currency::ZERO);
        assert_eq!(rule.on_close_amount(Currency::new(1_000.0)), Currency::ZERO);
    }

    #[test]
    fn test_recurring_amount_respects_frequency_and_cap() {
        let mut rule = FundTransferRule::new("Brokerage", Frequency::Quarterly, 10.0, 0.0);
        assert!(rule.bind(&registry()));

        let base = Currency::new(5_000.0);
        assert_eq!(rule.recurring_amount(base, 4), Currency::new(500.0));
        assert_eq!(rule.recurring_amount(base, 5), Currency::ZERO);

        rule.set_cap(Some(Currency::new(200.0)));
        assert_eq!(rule.recurring_amount(base, 7), Currency::new(200.0));
    }

    #[test]
    fn test_clamp_preserves_ratios() {
        let mut rules = vec![
            FundTransferRule::new("Cash", Frequency::Monthly, 90.0, 0.0),
            FundTransferRule::new("Brokerage", Frequency::Monthly, 60.0, 0.0),
            FundTransferRule::new("Brokerage", Frequency::None, 80.0, 0.0),
        ];
        assert!(clamp_recurring(&mut rules));

        let total = recurring_total(&rules);
        assert!((total - 100.0).abs() < 1e-9, "expected 100, got {total}");
        assert!((rules[0].recurring_pct() / rules[1].recurring_pct() - 1.5).abs() < 1e-9);
        // inactive rule untouched
        assert_eq!(rules[2].recurring_pct(), 80.0);
    }

    #[test]
    fn test_clamp_leaves_valid_allocations_alone() {
        let mut rules = vec![FundTransferRule::new("Cash", Frequency::Monthly, 40.0, 0.0)];
        assert!(!clamp_recurring(&mut rules));
        assert_eq!(rules[0].recurring_pct(), 40.0);
    }

    #[test]
    fn test_snapshot_carries_no_binding() {
        let mut rule = FundTransferRule::new("Cash", Frequency::Yearly, 12.5, 50.0);
        rule.bind(&registry());
        let restored = FundTransferRule::from_snapshot(&rule.snapshot());
        assert!(restored.bound().is_none());
        assert_eq!(restored.recurring_pct(), 12.5);
        assert_eq!(restored.target(), "Cash");
    }
}
