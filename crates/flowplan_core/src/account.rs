//! Account state machine
//!
//! An `Account` is one instrument: its persisted record, its transfer rules
//! and the runtime state a run builds up (balance, basis, ledger, memos).
//! Per-kind monthly and yearly behavior is selected through `STEP_RULES`,
//! a table indexed by `Behavior`; the portfolio decides *when* each step
//! runs and is the only caller that closes an account.
//!
//! Money only moves through `credit`/`debit`. Flow accounts (recurring
//! income and expenses) log the call but keep their formula-driven balance.

use tracing::debug;

use crate::calendar::{CalendarPoint, YearMonth};
use crate::context::SimulationContext;
use crate::error::SnapshotError;
use crate::metrics::{Metric, MetricLedger};
use crate::model::{
    AccountSnapshot, Behavior, FundTransferRule, InstrumentKind, Memo, TaxTreatment,
};
use crate::money::{AnnualRate, Currency};

/// Months an asset must be held before a gain counts as long-term.
pub const LONG_TERM_MONTHS: i32 = 12;

/// Social security benefits counted as ordinary income.
pub const TAXABLE_SOCIAL_SECURITY: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    BeforeStart,
    Active { on_start: bool, on_finish: bool },
    Closed,
}

/// Outcome of one credit or debit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reconciliation {
    pub balance_change: Currency,
    pub realized_gain: Currency,
    /// Whether `realized_gain` is long-term.
    pub long_term: bool,
}

/// One scheduled amortization payment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmortizationPayment {
    pub payment: Currency,
    pub interest: Currency,
    pub principal: Currency,
}

/// Level payment `r·P·(1+r)^n / ((1+r)^n - 1)`; `P/n` at a zero rate.
#[must_use]
pub fn amortization_payment(principal: f64, monthly_rate: f64, term: u32) -> f64 {
    if principal <= 0.0 || term == 0 {
        return 0.0;
    }
    if monthly_rate.abs() < 1e-12 {
        return principal / f64::from(term);
    }
    let growth = (1.0 + monthly_rate).powf(f64::from(term));
    monthly_rate * principal * growth / (growth - 1.0)
}

/// What a kind step did, for the portfolio's period totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepEffects {
    pub income: Currency,
    pub growth: Currency,
    pub dividend: Currency,
    pub interest: Currency,
    pub drift: Currency,
    pub raise: Currency,
}

type StepFn = fn(&mut Account, CalendarPoint, &SimulationContext) -> StepEffects;

/// Day-1, day-30 and yearly steps for one behavior.
struct StepRules {
    day_one: StepFn,
    month_end: StepFn,
    yearly: StepFn,
}

/// Indexed by `Behavior as usize`.
static STEP_RULES: [StepRules; 5] = [
    // RecurringIncome
    StepRules {
        day_one: recognize_income,
        month_end: no_step,
        yearly: apply_raise,
    },
    // RecurringExpense
    StepRules {
        day_one: no_step,
        month_end: drift_expense,
        yearly: no_step,
    },
    // Amortizing
    StepRules {
        day_one: schedule_payment,
        month_end: no_step,
        yearly: no_step,
    },
    // Capital
    StepRules {
        day_one: no_step,
        month_end: appreciate,
        yearly: no_step,
    },
    // Interest
    StepRules {
        day_one: no_step,
        month_end: accrue_interest,
        yearly: no_step,
    },
];

fn step_rules(behavior: Behavior) -> &'static StepRules {
    &STEP_RULES[behavior as usize]
}

fn no_step(_: &mut Account, _: CalendarPoint, _: &SimulationContext) -> StepEffects {
    StepEffects::default()
}

fn recognize_income(account: &mut Account, point: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let gross = account.balance.positive_part();
    account.note(point, account.income_metric(), gross);
    StepEffects {
        income: gross,
        ..Default::default()
    }
}

fn apply_raise(account: &mut Account, point: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let raise = account.balance * account.effective_rate().value();
    if !raise.is_zero() {
        account.apply(point, Metric::Raise, raise);
    }
    StepEffects {
        raise,
        ..Default::default()
    }
}

fn drift_expense(account: &mut Account, point: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let drift = account.balance * account.effective_rate().monthly();
    if !drift.is_zero() {
        account.apply(point, Metric::Drift, drift);
    }
    StepEffects {
        drift,
        ..Default::default()
    }
}

fn schedule_payment(account: &mut Account, _: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let principal = account.balance.flip_sign().positive_part().amount();
    let rate = account.effective_rate().monthly();
    let payment = amortization_payment(principal, rate, account.term_remaining);
    account.scheduled_payment = (payment > 0.0).then(|| {
        let interest = principal * rate;
        AmortizationPayment {
            payment: Currency::new(payment),
            interest: Currency::new(interest),
            principal: Currency::new((payment - interest).min(principal)),
        }
    });
    StepEffects::default()
}

fn appreciate(account: &mut Account, point: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let base = account.balance.positive_part();
    let growth = base * account.effective_rate().monthly();
    let dividend = base * account.record.dividend_rate.monthly();
    if !growth.is_zero() {
        account.apply(point, Metric::Growth, growth);
    }
    if !dividend.is_zero() {
        account.apply(point, Metric::Dividend, dividend);
        // reinvested dividends were taxed, so they add to basis
        if account.kind().tracks_basis() {
            account.basis += dividend;
        }
    }
    StepEffects {
        growth,
        dividend,
        ..Default::default()
    }
}

fn accrue_interest(account: &mut Account, point: CalendarPoint, _: &SimulationContext) -> StepEffects {
    let interest = account.balance.positive_part() * account.effective_rate().monthly();
    if !interest.is_zero() {
        account.apply(point, Metric::Interest, interest);
    }
    StepEffects {
        interest,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MonthOpen {
    balance: Currency,
    memo_index: usize,
}

/// Balance and basis captured when the portfolio starts closing an account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosingPosition {
    pub balance: Currency,
    pub basis: Currency,
    pub held_months: i32,
}

#[derive(Debug, Clone)]
pub struct Account {
    /// Persisted fields; `record.transfers` is kept empty, the live rules
    /// are in `transfers`.
    record: AccountSnapshot,
    transfers: Vec<FundTransferRule>,

    lifecycle: Lifecycle,
    balance: Currency,
    basis: Currency,
    pending: Currency,
    term_remaining: u32,
    rate_override: Option<AnnualRate>,
    scheduled_payment: Option<AmortizationPayment>,
    escrow_monthly: Currency,
    escrow_due: Currency,
    prior_year_balance: Currency,
    wages_ytd: Currency,
    contributions_ytd: Currency,
    month_open: MonthOpen,
    reconciled_through: usize,
    ledger: MetricLedger,
    memos: Vec<Memo>,
}

impl Account {
    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        let transfers = snapshot
            .transfers
            .iter()
            .map(FundTransferRule::from_snapshot)
            .collect();
        let record = AccountSnapshot {
            transfers: Vec::new(),
            ..snapshot.clone()
        };

        Ok(Account {
            record,
            transfers,
            lifecycle: Lifecycle::BeforeStart,
            balance: Currency::ZERO,
            basis: Currency::ZERO,
            pending: Currency::ZERO,
            term_remaining: 0,
            rate_override: None,
            scheduled_payment: None,
            escrow_monthly: Currency::ZERO,
            escrow_due: Currency::ZERO,
            prior_year_balance: Currency::ZERO,
            wages_ytd: Currency::ZERO,
            contributions_ytd: Currency::ZERO,
            month_open: MonthOpen::default(),
            reconciled_through: 0,
            ledger: MetricLedger::new(),
            memos: Vec::new(),
        })
    }

    /// Reference-free record with the current rule percentages.
    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            transfers: self.transfers.iter().map(FundTransferRule::snapshot).collect(),
            ..self.record.clone()
        }
    }

    /// Clear all runtime state for a fresh run. Memo storage is reused.
    pub fn initialize(&mut self) {
        self.lifecycle = Lifecycle::BeforeStart;
        self.balance = Currency::ZERO;
        self.basis = Currency::ZERO;
        self.pending = Currency::ZERO;
        self.term_remaining = 0;
        self.rate_override = None;
        self.scheduled_payment = None;
        self.escrow_monthly = Currency::ZERO;
        self.escrow_due = Currency::ZERO;
        self.prior_year_balance = Currency::ZERO;
        self.wages_ytd = Currency::ZERO;
        self.contributions_ytd = Currency::ZERO;
        self.month_open = MonthOpen::default();
        self.reconciled_through = 0;
        self.ledger.reset();
        self.memos.clear();
        for rule in &mut self.transfers {
            rule.unbind();
            rule.set_cap(None);
        }
    }

    #[must_use]
    pub fn kind(&self) -> InstrumentKind {
        self.record.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[must_use]
    pub fn start(&self) -> YearMonth {
        self.record.start
    }

    #[must_use]
    pub fn finish(&self) -> YearMonth {
        self.record.finish
    }

    #[must_use]
    pub fn record(&self) -> &AccountSnapshot {
        &self.record
    }

    #[must_use]
    pub fn balance(&self) -> Currency {
        self.balance
    }

    #[must_use]
    pub fn basis(&self) -> Currency {
        self.basis
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Active { .. })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    #[must_use]
    pub fn is_self_employed(&self) -> bool {
        self.record.self_employed
    }

    #[must_use]
    pub fn term_remaining(&self) -> u32 {
        self.term_remaining
    }

    #[must_use]
    pub fn tax_rate(&self) -> AnnualRate {
        self.record.tax_rate
    }

    #[must_use]
    pub fn effective_rate(&self) -> AnnualRate {
        self.rate_override.unwrap_or(self.record.rate)
    }

    /// Replace the configured rate for the current year (backtests).
    pub fn set_rate_override(&mut self, rate: Option<f64>) {
        self.rate_override = rate.map(AnnualRate::new);
    }

    #[must_use]
    pub fn rate_override(&self) -> Option<AnnualRate> {
        self.rate_override
    }

    #[must_use]
    pub fn transfers(&self) -> &[FundTransferRule] {
        &self.transfers
    }

    pub fn transfers_mut(&mut self) -> &mut [FundTransferRule] {
        &mut self.transfers
    }

    #[must_use]
    pub fn ledger(&self) -> &MetricLedger {
        &self.ledger
    }

    #[must_use]
    pub fn memos(&self) -> &[Memo] {
        &self.memos
    }

    #[must_use]
    pub fn scheduled_payment(&self) -> Option<AmortizationPayment> {
        self.scheduled_payment
    }

    #[must_use]
    pub fn prior_year_balance(&self) -> Currency {
        self.prior_year_balance
    }

    #[must_use]
    pub fn wages_ytd(&self) -> Currency {
        self.wages_ytd
    }

    pub fn add_wages(&mut self, wages: Currency) {
        self.wages_ytd += wages;
    }

    #[must_use]
    pub fn contributions_ytd(&self) -> Currency {
        self.contributions_ytd
    }

    /// Starting balance with the engine's sign convention: liabilities and
    /// expenses are negative.
    #[must_use]
    pub fn signed_starting_balance(&self) -> Currency {
        let amount = self.record.starting_balance;
        match self.kind() {
            InstrumentKind::Mortgage | InstrumentKind::Debt | InstrumentKind::Expense => {
                amount.abs().flip_sign()
            }
            _ => amount,
        }
    }

    /// Gross-income metric for a recurring-income account.
    #[must_use]
    pub fn income_metric(&self) -> Metric {
        if self.kind() == InstrumentKind::SocialSecurity {
            Metric::SocialSecurityIncome
        } else if self.record.self_employed {
            Metric::SelfEmployedIncome
        } else {
            Metric::EmployedIncome
        }
    }

    #[must_use]
    pub fn held_months(&self, point: CalendarPoint) -> i32 {
        self.record.start.start().months_until(point)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Update lifecycle flags for a day-1 checkpoint. Returns true when the
    /// account is past its finish and still open; closing is left to the
    /// portfolio.
    pub fn refresh(&mut self, point: CalendarPoint) -> bool {
        if self.is_closed() {
            return false;
        }
        let start = self.record.start.start();
        let end = self.record.finish.end();
        if point < start {
            self.lifecycle = Lifecycle::BeforeStart;
            false
        } else if point <= end {
            self.lifecycle = Lifecycle::Active {
                on_start: point == start,
                on_finish: point.same_month(end),
            };
            false
        } else {
            true
        }
    }

    /// Remember the balance and memo position the month starts from.
    pub fn open_month(&mut self) {
        self.ledger.close_month();
        self.month_open = MonthOpen {
            balance: self.balance,
            memo_index: self.memos.len(),
        };
    }

    /// Set the starting balance exactly on the start checkpoint.
    pub fn start_if_due(&mut self, point: CalendarPoint) {
        let Lifecycle::Active { on_start: true, .. } = self.lifecycle else {
            return;
        };
        let opening = self.signed_starting_balance();
        let delta = opening - self.balance;
        self.apply(point, Metric::Opening, delta);
        self.basis = if self.kind().tracks_basis() {
            self.record.starting_basis.positive_part()
        } else {
            Currency::ZERO
        };
        self.term_remaining = self.record.term_months;
        self.prior_year_balance = opening;
        self.reassess_escrow();
        debug!(account = %self.name(), balance = %opening, "account opened");
    }

    /// Capture balance and basis before closure.
    #[must_use]
    pub fn closing_position(&self, point: CalendarPoint) -> ClosingPosition {
        ClosingPosition {
            balance: self.balance,
            basis: self.basis,
            held_months: self.held_months(point),
        }
    }

    /// Zero the balance and mark the account closed for good.
    pub fn mark_closed(&mut self, point: CalendarPoint) {
        let remaining = self.balance;
        if !remaining.is_zero() {
            self.apply(point, Metric::Closing, remaining.flip_sign());
        }
        self.balance = Currency::ZERO;
        self.basis = Currency::ZERO;
        self.pending = Currency::ZERO;
        self.scheduled_payment = None;
        self.escrow_due = Currency::ZERO;
        self.lifecycle = Lifecycle::Closed;
        debug!(account = %self.name(), %point, "account closed");
    }

    // ------------------------------------------------------------------
    // Kind steps
    // ------------------------------------------------------------------

    pub fn day_one(&mut self, point: CalendarPoint, ctx: &SimulationContext) -> StepEffects {
        (step_rules(self.kind().behavior()).day_one)(self, point, ctx)
    }

    pub fn month_end(&mut self, point: CalendarPoint, ctx: &SimulationContext) -> StepEffects {
        (step_rules(self.kind().behavior()).month_end)(self, point, ctx)
    }

    pub fn yearly(&mut self, point: CalendarPoint, ctx: &SimulationContext) -> StepEffects {
        (step_rules(self.kind().behavior()).yearly)(self, point, ctx)
    }

    /// Book this month's scheduled payment: interest is noted, principal
    /// reduces the liability and the term shrinks by one month.
    pub fn settle_payment(&mut self, point: CalendarPoint) -> AmortizationPayment {
        let Some(payment) = self.scheduled_payment.take() else {
            return AmortizationPayment::default();
        };
        self.note(point, Metric::MortgageInterest, payment.interest);
        self.apply(point, Metric::MortgagePrincipal, payment.principal);
        self.term_remaining = self.term_remaining.saturating_sub(1);
        payment
    }

    /// Property tax per month from the current home value.
    pub fn reassess_escrow(&mut self) {
        self.escrow_monthly = if self.kind() == InstrumentKind::Home {
            self.balance.positive_part() * self.record.tax_rate.monthly()
        } else {
            Currency::ZERO
        };
    }

    pub fn accrue_escrow(&mut self) {
        self.escrow_due += self.escrow_monthly;
    }

    /// Escrow accrued since the last payment.
    pub fn take_escrow(&mut self) -> Currency {
        std::mem::take(&mut self.escrow_due)
    }

    #[must_use]
    pub fn escrow_monthly(&self) -> Currency {
        self.escrow_monthly
    }

    /// Outflow this account needs funded at month end.
    #[must_use]
    pub fn required_outflow(&self) -> Currency {
        match self.kind().behavior() {
            Behavior::RecurringExpense => self.balance.flip_sign().positive_part(),
            Behavior::Amortizing => self.scheduled_payment.map_or(Currency::ZERO, |p| p.payment),
            _ if self.kind() == InstrumentKind::Home => self.escrow_due,
            _ => Currency::ZERO,
        }
    }

    /// Year-end bookkeeping: remember the balance RMDs are based on and
    /// restart year-to-date counters.
    pub fn roll_year(&mut self) {
        self.prior_year_balance = self.balance;
        self.wages_ytd = Currency::ZERO;
        self.contributions_ytd = Currency::ZERO;
        self.ledger.close_year();
    }

    // ------------------------------------------------------------------
    // Money movement
    // ------------------------------------------------------------------

    /// Add money. Returns what the call did to the balance and any gain it
    /// realized.
    pub fn credit(
        &mut self,
        point: CalendarPoint,
        amount: Currency,
        label: Metric,
        skip_gain_recognition: bool,
    ) -> Reconciliation {
        if self.kind().is_flow() {
            self.note(point, label, amount);
            return Reconciliation::default();
        }
        self.pending += amount;
        self.reconcile_pending(point, label, skip_gain_recognition)
    }

    /// Remove money; see [`Account::credit`].
    pub fn debit(
        &mut self,
        point: CalendarPoint,
        amount: Currency,
        label: Metric,
        skip_gain_recognition: bool,
    ) -> Reconciliation {
        self.credit(point, amount.flip_sign(), label, skip_gain_recognition)
    }

    fn reconcile_pending(
        &mut self,
        point: CalendarPoint,
        label: Metric,
        skip_gain_recognition: bool,
    ) -> Reconciliation {
        let delta = std::mem::take(&mut self.pending);
        if delta.is_zero() {
            return Reconciliation::default();
        }
        let before = self.balance;
        let mut result = Reconciliation {
            balance_change: delta,
            ..Default::default()
        };

        match self.kind().tax_treatment() {
            TaxTreatment::Taxable if self.kind().tracks_basis() => {
                if delta > Currency::ZERO {
                    self.basis += delta;
                } else if before > Currency::ZERO {
                    let withdrawal = delta.flip_sign().min(before);
                    let fraction = withdrawal.amount() / before.amount();
                    if !skip_gain_recognition {
                        let basis_ratio = (self.basis.amount() / before.amount()).clamp(0.0, 1.0);
                        result.realized_gain = withdrawal * (1.0 - basis_ratio);
                        result.long_term = self.held_months(point) >= LONG_TERM_MONTHS;
                    }
                    self.basis = self.basis * (1.0 - fraction);
                }
            }
            TaxTreatment::TaxDeferred => {
                if delta > Currency::ZERO {
                    self.ledger.record(Metric::PreTaxContribution, delta);
                    self.contributions_ytd += delta;
                } else {
                    self.ledger.record(Metric::Distribution, delta.flip_sign());
                }
            }
            TaxTreatment::TaxFree => {
                if delta > Currency::ZERO {
                    self.ledger.record(Metric::Contribution, delta);
                    self.contributions_ytd += delta;
                } else {
                    self.ledger.record(Metric::Distribution, delta.flip_sign());
                }
            }
            _ => {}
        }

        self.apply(point, label, delta);
        result
    }

    /// Change the balance and log a memo.
    pub(crate) fn apply(&mut self, point: CalendarPoint, label: Metric, delta: Currency) {
        self.balance += delta;
        self.ledger.record(label, delta);
        self.memos.push(Memo::balance_change(point, label, delta));
    }

    /// Log an amount without touching the balance.
    pub(crate) fn note(&mut self, point: CalendarPoint, label: Metric, amount: Currency) {
        self.ledger.record(label, amount);
        self.memos.push(Memo::note(point, label, amount));
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    /// Difference between the live balance and month-open balance plus
    /// recorded changes, when it exceeds a cent.
    #[must_use]
    pub fn month_balance_error(&self) -> Option<Currency> {
        let recorded: Currency = self.memos[self.month_open.memo_index..]
            .iter()
            .map(|m| m.balance_delta)
            .sum();
        let expected = self.month_open.balance + recorded;
        (!expected.approx_eq(self.balance)).then(|| self.balance - expected)
    }

    /// Memos recorded since the last diagnostic reconciliation.
    #[must_use]
    pub fn unreconciled_memos(&self) -> &[Memo] {
        &self.memos[self.reconciled_through..]
    }

    pub fn mark_reconciled(&mut self) {
        self.reconciled_through = self.memos.len();
    }
}
