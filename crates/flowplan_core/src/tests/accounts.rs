//! Tests for account operations
//!
//! These tests verify:
//! - Realized gain and basis after deposits and withdrawals
//! - Short-term versus long-term classification by holding period
//! - Per-kind monthly and yearly steps (drift, raise, escrow)
//! - Closure leaves a zero balance for good

use super::{assert_close, ym};
use crate::account::{Account, Lifecycle};
use crate::calendar::CalendarPoint;
use crate::context::{SimulationContext, SimulationSettings};
use crate::metrics::Metric;
use crate::model::{AccountSnapshot, InstrumentKind};
use crate::money::Currency;

fn opened(snapshot: AccountSnapshot) -> Account {
    let point = snapshot.start.start();
    let mut account = Account::from_snapshot(&snapshot).unwrap();
    account.initialize();
    account.open_month();
    account.refresh(point);
    account.start_if_due(point);
    account
}

fn brokerage(balance: f64, basis: f64) -> Account {
    opened(
        AccountSnapshot::new(InstrumentKind::Brokerage, "Taxable", ym(2025, 1), ym(2040, 12))
            .balance(balance)
            .basis(basis),
    )
}

#[test]
fn test_realized_gain_after_deposits_and_withdrawal() {
    let mut account = brokerage(10_000.0, 4_000.0);
    let point = CalendarPoint::month_start(2025, 1);

    account.credit(point, Currency::new(1_000.0), Metric::TransferIn, false);
    account.credit(point, Currency::new(2_000.0), Metric::TransferIn, false);
    assert_eq!(account.basis(), Currency::new(7_000.0));

    let basis_before = account.basis().amount();
    let balance_before = account.balance().amount();
    let withdrawal = 3_900.0;
    let result = account.debit(point, Currency::new(withdrawal), Metric::TransferOut, false);

    let expected_gain = withdrawal * (1.0 - basis_before / balance_before);
    assert_close(result.realized_gain.amount(), expected_gain, 1e-9, "realized gain");
    assert_close(
        account.basis().amount(),
        basis_before * (1.0 - withdrawal / balance_before),
        1e-9,
        "basis after",
    );
    assert_eq!(result.balance_change, Currency::new(-withdrawal));
    assert!(!result.long_term);
}

#[test]
fn test_gain_becomes_long_term_after_twelve_months() {
    let mut account = brokerage(10_000.0, 5_000.0);

    let result = account.debit(
        CalendarPoint::month_end(2025, 12),
        Currency::new(1_000.0),
        Metric::TransferOut,
        false,
    );
    assert!(!result.long_term, "11 months held");

    let result = account.debit(
        CalendarPoint::month_start(2026, 1),
        Currency::new(1_000.0),
        Metric::TransferOut,
        false,
    );
    assert!(result.long_term, "12 months held");
}

#[test]
fn test_skip_gain_recognition_still_shrinks_basis() {
    let mut account = brokerage(10_000.0, 2_000.0);
    let point = CalendarPoint::month_start(2025, 1);

    let result = account.debit(point, Currency::new(5_000.0), Metric::TransferOut, true);
    assert_eq!(result.realized_gain, Currency::ZERO);
    assert_close(account.basis().amount(), 1_000.0, 1e-9, "basis");
}

#[test]
fn test_cash_has_no_basis() {
    let mut cash = opened(
        AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2030, 12))
            .balance(1_000.0)
            .basis(1_000.0),
    );
    let result = cash.debit(
        CalendarPoint::month_start(2025, 1),
        Currency::new(500.0),
        Metric::Expense,
        false,
    );
    assert_eq!(cash.basis(), Currency::ZERO);
    assert_eq!(result.realized_gain, Currency::ZERO);
    assert_eq!(cash.balance(), Currency::new(500.0));
}

#[test]
fn test_roth_contributions_are_classified() {
    let mut roth = opened(AccountSnapshot::new(
        InstrumentKind::Roth,
        "Roth",
        ym(2025, 1),
        ym(2050, 12),
    ));
    let point = CalendarPoint::month_start(2025, 2);
    roth.credit(point, Currency::new(600.0), Metric::TransferIn, false);
    roth.debit(point, Currency::new(100.0), Metric::TransferOut, false);

    assert_eq!(roth.ledger().lifetime(Metric::Contribution), Currency::new(600.0));
    assert_eq!(roth.ledger().lifetime(Metric::Distribution), Currency::new(100.0));
    assert_eq!(roth.contributions_ytd(), Currency::new(600.0));
}

#[test]
fn test_expense_drifts_monthly() {
    let ctx = SimulationContext::new(SimulationSettings::default(), 2025);
    let mut rent = opened(
        AccountSnapshot::new(InstrumentKind::Expense, "Rent", ym(2025, 1), ym(2030, 12))
            .balance(1_000.0)
            .rate(0.12),
    );
    assert_eq!(rent.balance(), Currency::new(-1_000.0));
    assert_eq!(rent.required_outflow(), Currency::new(1_000.0));

    let effects = rent.month_end(CalendarPoint::month_end(2025, 1), &ctx);
    assert_close(effects.drift.amount(), -10.0, 1e-9, "drift");
    assert_close(rent.balance().amount(), -1_010.0, 1e-9, "balance");
    assert!(rent.memos().iter().any(|m| m.label == Metric::Drift));
}

#[test]
fn test_income_raise_is_yearly_only() {
    let ctx = SimulationContext::new(SimulationSettings::default(), 2025);
    let mut salary = opened(
        AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2030, 12))
            .balance(5_000.0)
            .rate(0.03),
    );
    salary.month_end(CalendarPoint::month_end(2025, 1), &ctx);
    assert_eq!(salary.balance(), Currency::new(5_000.0));

    let effects = salary.yearly(CalendarPoint::month_start(2026, 1), &ctx);
    assert_close(effects.raise.amount(), 150.0, 1e-9, "raise");
    assert_close(salary.balance().amount(), 5_150.0, 1e-9, "raised pay");
}

#[test]
fn test_home_escrow_accrues_and_is_taken() {
    let mut home = opened(
        AccountSnapshot::new(InstrumentKind::Home, "House", ym(2025, 1), ym(2050, 12))
            .balance(400_000.0)
            .basis(350_000.0)
            .tax_rate(0.012),
    );
    assert_close(home.escrow_monthly().amount(), 400.0, 1e-9, "monthly escrow");

    home.accrue_escrow();
    assert_eq!(home.required_outflow(), Currency::new(400.0));
    assert_eq!(home.take_escrow(), Currency::new(400.0));
    assert_eq!(home.required_outflow(), Currency::ZERO);
}

#[test]
fn test_amortizing_payment_splits_interest_and_principal() {
    let ctx = SimulationContext::new(SimulationSettings::default(), 2025);
    let mut loan = opened(
        AccountSnapshot::new(InstrumentKind::Debt, "Car", ym(2025, 1), ym(2029, 12))
            .balance(24_000.0)
            .rate(0.06)
            .term(48),
    );
    loan.day_one(CalendarPoint::month_start(2025, 1), &ctx);
    let scheduled = loan.scheduled_payment().unwrap();
    assert_close(scheduled.interest.amount(), 120.0, 1e-9, "interest");
    assert_close(
        (scheduled.interest + scheduled.principal).amount(),
        scheduled.payment.amount(),
        1e-9,
        "split",
    );

    let paid = loan.settle_payment(CalendarPoint::month_end(2025, 1));
    assert_eq!(paid, scheduled);
    assert_eq!(loan.term_remaining(), 47);
    assert_close(
        loan.balance().amount(),
        -24_000.0 + scheduled.principal.amount(),
        1e-9,
        "balance",
    );
    assert!(loan.month_balance_error().is_none());
}

#[test]
fn test_closed_account_stays_zero() {
    let mut account = brokerage(5_000.0, 5_000.0);
    let point = CalendarPoint::month_start(2041, 1);
    assert!(account.refresh(point));

    account.mark_closed(point);
    assert_eq!(account.lifecycle(), Lifecycle::Closed);
    assert_eq!(account.balance(), Currency::ZERO);
    assert!(account.month_balance_error().is_none());

    assert!(!account.refresh(CalendarPoint::month_start(2041, 2)));
    assert!(account.is_closed());
}
