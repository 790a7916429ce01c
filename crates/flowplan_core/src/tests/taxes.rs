//! Tests for tax calculations
//!
//! These tests verify:
//! - Bracket tax is non-decreasing and continuous at bracket boundaries
//! - Long-term gains stack on ordinary income
//! - FICA rates and the Social Security wage base
//! - Paycheck withholding, RMDs and contribution limits inside a run
//! - Roth and traditional IRAs draw on one shared limit

use super::{assert_close, build, build_with, ym};
use crate::chronometer::run_chronometer;
use crate::context::SimulationSettings;
use crate::metrics::Metric;
use crate::model::{AccountSnapshot, Frequency, InstrumentKind};
use crate::money::Currency;
use crate::taxes::{FilingStatus, TaxTable};

#[test]
fn test_income_tax_is_monotonic() {
    for status in [FilingStatus::Single, FilingStatus::MarriedJoint] {
        let table = TaxTable::us_federal_2024(status);
        let mut previous = 0.0;
        for step in 0..4_000 {
            let income = f64::from(step) * 250.0;
            let tax = table.yearly_income_tax(income);
            assert!(tax >= previous, "{status:?}: tax fell at {income}");
            previous = tax;
        }
    }
}

#[test]
fn test_income_tax_is_continuous_at_boundaries() {
    let table = TaxTable::default();
    for bracket in table.ordinary_brackets() {
        let below = table.yearly_income_tax(bracket.threshold - 0.001);
        let above = table.yearly_income_tax(bracket.threshold + 0.001);
        assert!(
            (above - below).abs() < 0.01,
            "jump at {}: {below} -> {above}",
            bracket.threshold
        );
    }
    assert_eq!(table.yearly_income_tax(0.0), 0.0);
    assert_eq!(table.yearly_income_tax(-5_000.0), 0.0);
}

#[test]
fn test_long_term_gains_stack_on_ordinary_income() {
    let table = TaxTable::default();
    // 7,025 fills the 0% bracket, the remaining 12,975 is taxed at 15%
    let tax = table.yearly_long_term_gains_tax(40_000.0, 20_000.0);
    assert_close(tax, 12_975.0 * 0.15, 1e-6, "stacked gains tax");

    assert_eq!(table.yearly_long_term_gains_tax(10_000.0, 30_000.0), 0.0);
    assert_eq!(table.yearly_long_term_gains_tax(50_000.0, 0.0), 0.0);
}

#[test]
fn test_fica_rates_and_wage_base() {
    let table = TaxTable::default();
    let employed = table.fica_tax(Currency::new(10_000.0), Currency::ZERO, false);
    assert_close(employed.total().amount(), 765.0, 1e-9, "employee FICA");

    let self_employed = table.fica_tax(Currency::new(10_000.0), Currency::ZERO, true);
    assert_close(self_employed.total().amount(), 1_530.0, 1e-9, "self-employed FICA");

    let capped = table.fica_tax(Currency::new(10_000.0), Currency::new(165_000.0), false);
    assert_close(capped.social_security.amount(), 3_600.0 * 0.062, 1e-9, "capped social security");
    assert_close(capped.medicare.amount(), 145.0, 1e-9, "uncapped medicare");
}

#[test]
fn test_inflation_scales_thresholds() {
    let mut table = TaxTable::default();
    let before = table.ordinary_brackets()[2].threshold;
    table.inflate(0.10);
    assert_close(table.ordinary_brackets()[2].threshold, before * 1.1, 1e-6, "threshold");
    assert_close(table.standard_deduction(), 14_600.0 * 1.1, 1e-6, "deduction");
    assert_close(table.fica.wage_base, 168_600.0 * 1.1, 1e-6, "wage base");
    assert_eq!(table.year, 2025);
}

#[test]
fn test_paycheck_withholding() {
    let mut portfolio = build(&[
        AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2025, 1)).balance(10_000.0),
        AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 1)),
    ]);
    run_chronometer(&mut portfolio).unwrap();

    let table = TaxTable::default();
    let withholding = table.yearly_income_tax(120_000.0 - 14_600.0) / 12.0;
    let totals = portfolio.lifetime_totals();
    assert_close(totals.fica.amount(), 765.0, 1e-6, "FICA");
    assert_close(totals.income_tax.amount(), withholding, 1e-6, "withholding");

    let cash = portfolio.account("Checking").unwrap();
    assert_close(
        cash.balance().amount(),
        10_000.0 - 765.0 - withholding,
        1e-6,
        "net pay",
    );
}

#[test]
fn test_rmd_distributes_from_prior_balance() {
    let settings = SimulationSettings {
        age: 75,
        ..Default::default()
    };
    let mut portfolio = build_with(
        settings,
        &[
            AccountSnapshot::new(InstrumentKind::TraditionalIra, "IRA", ym(2025, 1), ym(2025, 1))
                .balance(100_000.0),
            AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 1)),
        ],
    );
    run_chronometer(&mut portfolio).unwrap();

    let expected = 100_000.0 / 24.6 / 12.0;
    assert_close(portfolio.lifetime_totals().rmd.amount(), expected, 1e-6, "RMD");
    let ira = portfolio.account("IRA").unwrap();
    assert_close(ira.balance().amount(), 100_000.0 - expected, 1e-6, "IRA balance");
    assert_close(
        ira.ledger().lifetime(Metric::Distribution).amount(),
        expected,
        1e-6,
        "distribution ledger",
    );
    // the distribution stays under the standard deduction
    assert_eq!(portfolio.lifetime_totals().income_tax, Currency::ZERO);
}

#[test]
fn test_no_rmd_before_eligibility() {
    let mut portfolio = build(&[
        AccountSnapshot::new(InstrumentKind::TraditionalIra, "IRA", ym(2025, 1), ym(2025, 12))
            .balance(100_000.0),
        AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 12)),
    ]);
    run_chronometer(&mut portfolio).unwrap();
    assert_eq!(portfolio.lifetime_totals().rmd, Currency::ZERO);
}

#[test]
fn test_employer_plan_contributions_stop_at_limit() {
    let mut portfolio = build(&[
        AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2025, 12))
            .balance(20_000.0)
            .transfer("401k", Frequency::Monthly, 50.0, 0.0),
        AccountSnapshot::new(InstrumentKind::EmployerPlan, "401k", ym(2025, 1), ym(2025, 12)),
        AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 12)),
    ]);
    run_chronometer(&mut portfolio).unwrap();

    let totals = portfolio.lifetime_totals();
    assert_close(totals.pre_tax_contributions.amount(), 23_000.0, 1e-6, "pre-tax contributions");
    let plan = portfolio.account("401k").unwrap();
    assert_close(plan.balance().amount(), 23_000.0, 1e-6, "plan balance");
    assert_close(plan.contributions_ytd().amount(), 23_000.0, 1e-6, "contributions ytd");
}

#[test]
fn test_roth_and_ira_share_one_limit() {
    let settings = SimulationSettings {
        age: 40,
        ..Default::default()
    };
    let mut portfolio = build_with(
        settings,
        &[
            AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2025, 12))
                .balance(10_000.0)
                .transfer("Roth", Frequency::Monthly, 10.0, 0.0)
                .transfer("IRA", Frequency::Monthly, 10.0, 0.0),
            AccountSnapshot::new(InstrumentKind::Roth, "Roth", ym(2025, 1), ym(2025, 12)),
            AccountSnapshot::new(InstrumentKind::TraditionalIra, "IRA", ym(2025, 1), ym(2025, 12)),
            AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 12)),
        ],
    );
    run_chronometer(&mut portfolio).unwrap();

    let roth = portfolio.account("Roth").unwrap().contributions_ytd().amount();
    let ira = portfolio.account("IRA").unwrap().contributions_ytd().amount();
    assert!(roth > 0.0 && ira > 0.0, "both accounts received money");
    assert_close(roth + ira, 7_000.0, 1e-6, "shared IRA limit");

    let totals = portfolio.lifetime_totals();
    assert_close(
        (totals.pre_tax_contributions + totals.tax_free_contributions).amount(),
        7_000.0,
        1e-6,
        "contribution totals",
    );
}

#[test]
fn test_catch_up_raises_the_limit() {
    let settings = SimulationSettings {
        age: 55,
        ..Default::default()
    };
    let mut portfolio = build_with(
        settings,
        &[
            AccountSnapshot::new(InstrumentKind::Salary, "Job", ym(2025, 1), ym(2025, 12))
                .balance(20_000.0)
                .transfer("401k", Frequency::Monthly, 50.0, 0.0),
            AccountSnapshot::new(InstrumentKind::EmployerPlan, "401k", ym(2025, 1), ym(2025, 12)),
            AccountSnapshot::new(InstrumentKind::Cash, "Checking", ym(2025, 1), ym(2025, 12)),
        ],
    );
    run_chronometer(&mut portfolio).unwrap();
    assert_close(
        portfolio.lifetime_totals().pre_tax_contributions.amount(),
        30_500.0,
        1e-6,
        "limit with catch-up",
    );
}
