//! Year-scoped tax table
//!
//! Progressive ordinary-income brackets, long-term capital gains brackets
//! stacked on top of ordinary income, FICA with a cumulative wage base,
//! contribution limits by age band and the RMD divisor table. One instance
//! is owned by each simulation context and inflated once per simulated year.
//!
//! The numbers approximate US federal law for 2024; they are not meant to be
//! statutorily exact.

use serde::{Deserialize, Serialize};

use crate::model::{InstrumentKind, RmdTable, TaxTreatment};
use crate::money::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    MarriedJoint,
}

/// A bracket starts at `threshold`; it ends where the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub threshold: f64,
    pub rate: f64,
}

const fn bracket(threshold: f64, rate: f64) -> TaxBracket {
    TaxBracket { threshold, rate }
}

/// A value that differs by filing status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByStatus<T> {
    pub single: T,
    pub married_joint: T,
}

impl<T> ByStatus<T> {
    #[must_use]
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedJoint => &self.married_joint,
        }
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        f(&mut self.single);
        f(&mut self.married_joint);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FicaRates {
    /// Employee share of Social Security; self-employed pay twice this.
    pub social_security: f64,
    /// Employee share of Medicare; self-employed pay twice this.
    pub medicare: f64,
    /// Social Security applies only to wages up to this cumulative amount per year.
    pub wage_base: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionLimits {
    pub ira: f64,
    pub ira_catch_up: f64,
    pub employer_plan: f64,
    pub employer_plan_catch_up: f64,
    pub catch_up_age: u8,
}

/// Accounts whose contributions count against one shared annual limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitGroup {
    EmployerPlan,
    /// Roth and traditional IRAs together.
    Ira,
}

impl LimitGroup {
    #[must_use]
    pub fn of(kind: InstrumentKind) -> Option<Self> {
        match kind {
            InstrumentKind::EmployerPlan => Some(LimitGroup::EmployerPlan),
            InstrumentKind::TraditionalIra | InstrumentKind::Roth => Some(LimitGroup::Ira),
            _ => None,
        }
    }
}

/// FICA split for one paycheck.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FicaTax {
    pub social_security: Currency,
    pub medicare: Currency,
}

impl FicaTax {
    #[must_use]
    pub fn total(&self) -> Currency {
        self.social_security + self.medicare
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTable {
    pub year: u16,
    pub filing_status: FilingStatus,
    pub ordinary: ByStatus<Vec<TaxBracket>>,
    pub long_term_gains: ByStatus<Vec<TaxBracket>>,
    pub standard_deduction: ByStatus<f64>,
    /// Gain excluded on the sale of a long-held primary residence.
    pub home_exclusion: ByStatus<f64>,
    pub fica: FicaRates,
    pub limits: ContributionLimits,
    pub rmd: RmdTable,
}

impl Default for TaxTable {
    fn default() -> Self {
        Self::us_federal_2024(FilingStatus::Single)
    }
}

/// Tax from progressive brackets: each bracket reached contributes
/// `(min(income, top) - bottom) * rate`; the last bracket is unbounded.
#[must_use]
pub fn bracket_tax(income: f64, brackets: &[TaxBracket]) -> f64 {
    if income <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut tax = 0.0;
    for (i, b) in brackets.iter().enumerate() {
        if income <= b.threshold {
            break;
        }
        let top = brackets.get(i + 1).map_or(f64::INFINITY, |next| next.threshold);
        tax += (income.min(top) - b.threshold) * b.rate;
    }
    tax
}

/// Tax on `gains` stacked above `ordinary` income: only the part of each
/// bracket range lying above ordinary income and below the combined income is
/// taxed at that bracket's rate.
#[must_use]
pub fn stacked_bracket_tax(ordinary: f64, gains: f64, brackets: &[TaxBracket]) -> f64 {
    if gains <= 0.0 || brackets.is_empty() {
        return 0.0;
    }
    let floor = ordinary.max(0.0);
    let ceiling = floor + gains;

    brackets
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let top = brackets.get(i + 1).map_or(f64::INFINITY, |next| next.threshold);
            let overlap = ceiling.min(top) - floor.max(b.threshold);
            overlap.max(0.0) * b.rate
        })
        .sum()
}

/// Rate of the bracket containing `income`.
#[must_use]
pub fn marginal_rate(income: f64, brackets: &[TaxBracket]) -> f64 {
    brackets
        .iter()
        .take_while(|b| b.threshold <= income.max(0.0))
        .last()
        .map_or(0.0, |b| b.rate)
}

impl TaxTable {
    /// 2024 US federal approximation.
    #[must_use]
    pub fn us_federal_2024(filing_status: FilingStatus) -> Self {
        TaxTable {
            year: 2024,
            filing_status,
            ordinary: ByStatus {
                single: vec![
                    bracket(0.0, 0.10),
                    bracket(11_600.0, 0.12),
                    bracket(47_150.0, 0.22),
                    bracket(100_525.0, 0.24),
                    bracket(191_950.0, 0.32),
                    bracket(243_725.0, 0.35),
                    bracket(609_350.0, 0.37),
                ],
                married_joint: vec![
                    bracket(0.0, 0.10),
                    bracket(23_200.0, 0.12),
                    bracket(94_300.0, 0.22),
                    bracket(201_050.0, 0.24),
                    bracket(383_900.0, 0.32),
                    bracket(487_450.0, 0.35),
                    bracket(731_200.0, 0.37),
                ],
            },
            long_term_gains: ByStatus {
                single: vec![
                    bracket(0.0, 0.0),
                    bracket(47_025.0, 0.15),
                    bracket(518_900.0, 0.20),
                ],
                married_joint: vec![
                    bracket(0.0, 0.0),
                    bracket(94_050.0, 0.15),
                    bracket(583_750.0, 0.20),
                ],
            },
            standard_deduction: ByStatus {
                single: 14_600.0,
                married_joint: 29_200.0,
            },
            home_exclusion: ByStatus {
                single: 250_000.0,
                married_joint: 500_000.0,
            },
            fica: FicaRates {
                social_security: 0.062,
                medicare: 0.0145,
                wage_base: 168_600.0,
            },
            limits: ContributionLimits {
                ira: 7_000.0,
                ira_catch_up: 1_000.0,
                employer_plan: 23_000.0,
                employer_plan_catch_up: 7_500.0,
                catch_up_age: 50,
            },
            rmd: RmdTable::irs_uniform_lifetime_2024(),
        }
    }

    #[must_use]
    pub fn ordinary_brackets(&self) -> &[TaxBracket] {
        self.ordinary.get(self.filing_status)
    }

    #[must_use]
    pub fn gains_brackets(&self) -> &[TaxBracket] {
        self.long_term_gains.get(self.filing_status)
    }

    #[must_use]
    pub fn standard_deduction(&self) -> f64 {
        *self.standard_deduction.get(self.filing_status)
    }

    #[must_use]
    pub fn home_exclusion(&self) -> f64 {
        *self.home_exclusion.get(self.filing_status)
    }

    /// Ordinary income tax on already-deducted taxable income.
    #[must_use]
    pub fn yearly_income_tax(&self, taxable_income: f64) -> f64 {
        bracket_tax(taxable_income, self.ordinary_brackets())
    }

    /// Long-term gains tax with gains stacked on ordinary taxable income.
    #[must_use]
    pub fn yearly_long_term_gains_tax(&self, ordinary_taxable_income: f64, gains: f64) -> f64 {
        stacked_bracket_tax(ordinary_taxable_income, gains, self.gains_brackets())
    }

    /// Extra ordinary tax caused by `additional` income on top of `base`.
    #[must_use]
    pub fn marginal_income_tax(&self, base: f64, additional: f64) -> f64 {
        if additional <= 0.0 {
            return 0.0;
        }
        self.yearly_income_tax(base + additional) - self.yearly_income_tax(base)
    }

    /// Ordinary rate that the next dollar of income would pay. Income still
    /// under the deduction pays nothing.
    #[must_use]
    pub fn marginal_income_rate(&self, ordinary_taxable_income: f64) -> f64 {
        if ordinary_taxable_income < 0.0 {
            return 0.0;
        }
        marginal_rate(ordinary_taxable_income, self.ordinary_brackets())
    }

    /// Long-term gains rate that the next dollar of gain would pay.
    #[must_use]
    pub fn marginal_gains_rate(&self, ordinary_taxable_income: f64) -> f64 {
        marginal_rate(ordinary_taxable_income, self.gains_brackets())
    }

    /// FICA on `wages` given `wages_ytd` already paid this year. Employees pay
    /// the half rates; the self-employed pay both halves. Social Security stops
    /// at the cumulative wage base.
    #[must_use]
    pub fn fica_tax(&self, wages: Currency, wages_ytd: Currency, self_employed: bool) -> FicaTax {
        let wages = wages.amount().max(0.0);
        let multiplier = if self_employed { 2.0 } else { 1.0 };
        let room = (self.fica.wage_base - wages_ytd.amount().max(0.0)).max(0.0);
        let ss_wages = wages.min(room);

        FicaTax {
            social_security: Currency::new(ss_wages * self.fica.social_security * multiplier),
            medicare: Currency::new(wages * self.fica.medicare * multiplier),
        }
    }

    #[must_use]
    pub fn monthly_rmd(&self, prior_balance: Currency, age: u8) -> Currency {
        self.rmd.monthly_rmd(prior_balance, age)
    }

    #[must_use]
    pub fn rmd_eligible(&self, age: u8) -> bool {
        age >= self.rmd.start_age
    }

    /// Annual contribution limit for a target account, if it has one. The
    /// limit is shared by every account in the same `LimitGroup`.
    #[must_use]
    pub fn contribution_limit(&self, kind: InstrumentKind, age: u8) -> Option<Currency> {
        let catch_up = age >= self.limits.catch_up_age;
        let limit = match LimitGroup::of(kind)? {
            LimitGroup::EmployerPlan => {
                self.limits.employer_plan
                    + if catch_up { self.limits.employer_plan_catch_up } else { 0.0 }
            }
            LimitGroup::Ira => self.limits.ira + if catch_up { self.limits.ira_catch_up } else { 0.0 },
        };
        Some(Currency::new(limit))
    }

    /// Whether contributions into `kind` reduce taxable wages.
    #[must_use]
    pub fn is_pre_tax_target(kind: InstrumentKind) -> bool {
        kind.tax_treatment() == TaxTreatment::TaxDeferred
    }

    /// Advance one year: scale bracket boundaries, the wage base, the standard
    /// deduction and the home exclusion by `1 + inflation`.
    pub fn inflate(&mut self, inflation: f64) {
        let factor = 1.0 + inflation;
        let scale = |brackets: &mut Vec<TaxBracket>| {
            for b in brackets.iter_mut() {
                b.threshold *= factor;
            }
        };
        self.ordinary.for_each_mut(scale);
        self.long_term_gains.for_each_mut(scale);
        self.standard_deduction.for_each_mut(|d| *d *= factor);
        self.home_exclusion.for_each_mut(|e| *e *= factor);
        self.fica.wage_base *= factor;
        self.year += 1;
    }
}
