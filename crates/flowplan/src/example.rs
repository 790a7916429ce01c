//! Starter portfolio written by `flowplan example`

use flowplan_core::optimization::GeneticConfig;
use flowplan_core::{AccountSnapshot, Frequency, InstrumentKind, SimulationSettings, YearMonth};

use crate::storage::PortfolioFile;

const RETIREMENT_AGE: u16 = 65;
const SOCIAL_SECURITY_AGE: u16 = 67;
const PLAN_TO_AGE: u16 = 90;

/// A mid-career household starting next January.
pub fn example_portfolio(current_year: i16) -> PortfolioFile {
    let first_year = u16::try_from(current_year).unwrap_or(2025) + 1;
    let born = first_year - 40;
    let settings = SimulationSettings {
        birth_year: Some(born),
        capture_reports: true,
        ..Default::default()
    };
    let start = YearMonth::new(first_year, 1);
    let retire = YearMonth::new(born + RETIREMENT_AGE, 12);
    let benefits = YearMonth::new(born + SOCIAL_SECURITY_AGE, 1);
    let end = YearMonth::new(born + PLAN_TO_AGE, 12);

    let accounts = vec![
        AccountSnapshot::new(InstrumentKind::Salary, "Paycheck", start, retire)
            .balance(9_500.0)
            .rate(0.03)
            .transfer("401k", Frequency::Monthly, 10.0, 0.0)
            .transfer("Roth IRA", Frequency::Monthly, 5.0, 0.0)
            .transfer("Brokerage", Frequency::Monthly, 10.0, 0.0),
        AccountSnapshot::new(InstrumentKind::SocialSecurity, "Social Security", benefits, end)
            .balance(2_800.0)
            .rate(0.02),
        AccountSnapshot::new(InstrumentKind::EmployerPlan, "401k", start, end)
            .balance(120_000.0)
            .rate(0.07),
        AccountSnapshot::new(InstrumentKind::Roth, "Roth IRA", start, end)
            .balance(35_000.0)
            .rate(0.07),
        AccountSnapshot::new(InstrumentKind::Brokerage, "Brokerage", start, end)
            .balance(60_000.0)
            .basis(45_000.0)
            .rate(0.06)
            .dividend_rate(0.015),
        AccountSnapshot::new(InstrumentKind::Cash, "Checking", start, end)
            .balance(12_000.0)
            .rate(0.005),
        AccountSnapshot::new(InstrumentKind::Savings, "Emergency Fund", start, end)
            .balance(25_000.0)
            .rate(0.04),
        AccountSnapshot::new(InstrumentKind::Expense, "Living", start, end)
            .balance(3_800.0)
            .rate(0.03)
            .transfer("Checking", Frequency::Monthly, 100.0, 0.0),
        AccountSnapshot::new(InstrumentKind::Home, "House", start, end)
            .balance(450_000.0)
            .basis(380_000.0)
            .rate(0.035)
            .tax_rate(0.011)
            .transfer("Checking", Frequency::Monthly, 100.0, 0.0),
        AccountSnapshot::new(InstrumentKind::Mortgage, "Mortgage", start, end)
            .balance(310_000.0)
            .rate(0.0625)
            .term(312)
            .transfer("Checking", Frequency::Monthly, 100.0, 0.0),
    ];

    PortfolioFile {
        settings,
        accounts,
        optimizer: Some(GeneticConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowplan_core::{Portfolio, run_chronometer};

    #[test]
    fn test_example_runs() {
        let file = example_portfolio(2025);
        assert_eq!(file.accounts[0].start, YearMonth::new(2026, 1));

        let mut portfolio = Portfolio::new(file.settings.clone(), &file.accounts).unwrap();
        let summary = run_chronometer(&mut portfolio).unwrap();
        assert_eq!(summary.last, YearMonth::new(2076, 12).end());
        assert!(!portfolio.reports().is_empty());
    }

    #[test]
    fn test_example_survives_yaml() {
        let file = example_portfolio(2025);
        let yaml = file.to_yaml().unwrap();
        assert_eq!(PortfolioFile::from_yaml(&yaml).unwrap(), file);
    }
}
