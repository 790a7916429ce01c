//! Instrument kinds and their dispatch table
//!
//! Every per-kind decision in the engine (monthly behavior, tax treatment,
//! historical return class, priority, whether it can absorb shortfalls) is
//! one row in `InstrumentKind::traits`, so callers branch on a category
//! instead of chaining kind predicates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of financial instruments an account can model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Home,
    Mortgage,
    Salary,
    SocialSecurity,
    TaxableBond,
    Savings,
    /// Roth IRA / Roth 401(k): contributions post-tax, withdrawals tax-free
    Roth,
    /// Traditional IRA: tax-deferred
    TraditionalIra,
    /// Employer 401(k)/403(b): tax-deferred
    EmployerPlan,
    Brokerage,
    Cash,
    Debt,
    Expense,
}

/// How the account's balance evolves each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Balance is the gross monthly paycheck.
    RecurringIncome,
    /// Balance is the (negative) monthly outflow, inflating monthly.
    RecurringExpense,
    /// Liability paid down by a level payment.
    Amortizing,
    /// Appreciating asset with optional dividend.
    Capital,
    /// Simple interest-bearing holding.
    Interest,
}

impl Behavior {
    /// Flow accounts have formula-driven balances; credits and debits only memo.
    #[must_use]
    pub const fn is_flow(self) -> bool {
        matches!(self, Behavior::RecurringIncome | Behavior::RecurringExpense)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxTreatment {
    Taxable,
    TaxDeferred,
    TaxFree,
    /// Not an investment (income streams, expenses, liabilities).
    Exempt,
}

/// Which historical series drives the account's rate in backtest mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnClass {
    Equity,
    Bond,
    Inflation,
    Wage,
    Fixed,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentTraits {
    pub behavior: Behavior,
    pub tax: TaxTreatment,
    pub return_class: ReturnClass,
    pub priority: u8,
    pub expensable: bool,
    pub tracks_basis: bool,
}

const fn row(
    behavior: Behavior,
    tax: TaxTreatment,
    return_class: ReturnClass,
    priority: u8,
    expensable: bool,
    tracks_basis: bool,
) -> InstrumentTraits {
    InstrumentTraits {
        behavior,
        tax,
        return_class,
        priority,
        expensable,
        tracks_basis,
    }
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 13] = [
        InstrumentKind::Home,
        InstrumentKind::Mortgage,
        InstrumentKind::Salary,
        InstrumentKind::SocialSecurity,
        InstrumentKind::TaxableBond,
        InstrumentKind::Savings,
        InstrumentKind::Roth,
        InstrumentKind::TraditionalIra,
        InstrumentKind::EmployerPlan,
        InstrumentKind::Brokerage,
        InstrumentKind::Cash,
        InstrumentKind::Debt,
        InstrumentKind::Expense,
    ];

    #[must_use]
    pub const fn traits(self) -> InstrumentTraits {
        use Behavior::*;
        use ReturnClass::*;
        use TaxTreatment::*;
        match self {
            InstrumentKind::Mortgage => row(Amortizing, Exempt, Fixed, 0, false, false),
            InstrumentKind::Debt => row(Amortizing, Exempt, Fixed, 1, false, false),
            InstrumentKind::Home => row(Capital, Taxable, Inflation, 2, false, true),
            InstrumentKind::Salary => row(RecurringIncome, Exempt, Wage, 3, false, false),
            InstrumentKind::SocialSecurity => row(RecurringIncome, Exempt, Inflation, 4, false, false),
            InstrumentKind::EmployerPlan => row(Capital, TaxDeferred, Equity, 5, false, false),
            InstrumentKind::TraditionalIra => row(Capital, TaxDeferred, Equity, 6, false, false),
            InstrumentKind::Roth => row(Capital, TaxFree, Equity, 7, false, false),
            InstrumentKind::Brokerage => row(Capital, Taxable, Equity, 8, false, true),
            InstrumentKind::TaxableBond => row(Interest, Taxable, Bond, 9, false, false),
            InstrumentKind::Cash => row(Interest, Taxable, Bond, 10, true, false),
            InstrumentKind::Savings => row(Interest, Taxable, Bond, 11, true, false),
            InstrumentKind::Expense => row(RecurringExpense, Exempt, Inflation, 12, false, false),
        }
    }

    #[must_use]
    pub const fn behavior(self) -> Behavior {
        self.traits().behavior
    }

    #[must_use]
    pub const fn tax_treatment(self) -> TaxTreatment {
        self.traits().tax
    }

    #[must_use]
    pub const fn return_class(self) -> ReturnClass {
        self.traits().return_class
    }

    #[must_use]
    pub const fn priority(self) -> u8 {
        self.traits().priority
    }

    #[must_use]
    pub const fn is_expensable(self) -> bool {
        self.traits().expensable
    }

    #[must_use]
    pub const fn tracks_basis(self) -> bool {
        self.traits().tracks_basis
    }

    #[must_use]
    pub const fn is_flow(self) -> bool {
        self.traits().behavior.is_flow()
    }

    /// Outflow accounts: transfer rules draw funding *from* their targets.
    #[must_use]
    pub const fn is_outflow(self) -> bool {
        matches!(
            self,
            InstrumentKind::Expense
                | InstrumentKind::Mortgage
                | InstrumentKind::Debt
                | InstrumentKind::Home
        )
    }

    /// Taxable account with basis, used to cover shortfalls with a gross-up.
    #[must_use]
    pub const fn is_taxable_capital(self) -> bool {
        matches!(self, InstrumentKind::Brokerage)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            InstrumentKind::Home => "home",
            InstrumentKind::Mortgage => "mortgage",
            InstrumentKind::Salary => "salary",
            InstrumentKind::SocialSecurity => "social security",
            InstrumentKind::TaxableBond => "taxable bond",
            InstrumentKind::Savings => "savings",
            InstrumentKind::Roth => "roth",
            InstrumentKind::TraditionalIra => "traditional ira",
            InstrumentKind::EmployerPlan => "employer plan",
            InstrumentKind::Brokerage => "brokerage",
            InstrumentKind::Cash => "cash",
            InstrumentKind::Debt => "debt",
            InstrumentKind::Expense => "expense",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
