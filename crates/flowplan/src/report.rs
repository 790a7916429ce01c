//! Text and JSON rendering of run and optimizer results

use std::fmt::Write;

use clap::ValueEnum;
use flowplan_core::model::Granularity;
use flowplan_core::optimization::OptimizationResult;
use flowplan_core::{
    AccountSnapshot, Currency, InstrumentKind, PeriodReport, PeriodTotals, Portfolio, RunSummary,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountLine {
    pub name: String,
    pub kind: InstrumentKind,
    pub balance: Currency,
    pub closed: bool,
}

/// Everything printed after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub accounts: Vec<AccountLine>,
    pub lifetime: PeriodTotals,
    pub yearly: Vec<PeriodReport>,
}

impl RunReport {
    pub fn from_portfolio(portfolio: &Portfolio, summary: RunSummary) -> Self {
        let accounts = portfolio
            .accounts()
            .iter()
            .map(|account| AccountLine {
                name: account.name().to_string(),
                kind: account.kind(),
                balance: account.balance(),
                closed: account.is_closed(),
            })
            .collect();
        let yearly = portfolio
            .reports()
            .iter()
            .filter(|r| r.granularity == Granularity::Yearly)
            .cloned()
            .collect();
        RunReport {
            summary,
            accounts,
            lifetime: *portfolio.lifetime_totals(),
            yearly,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(out, "Simulated {} .. {} ({} months)", s.first, s.last, s.months);
        let _ = writeln!(out, "Terminal net worth: {}", s.terminal_value);

        let _ = writeln!(out, "\nAccounts");
        for account in &self.accounts {
            let status = if account.closed { " (closed)" } else { "" };
            let _ = writeln!(
                out,
                "  {:<24} {:<16} {:>16}{status}",
                account.name,
                account.kind.to_string(),
                account.balance.to_string()
            );
        }

        let _ = writeln!(out, "\nLifetime totals");
        for (name, value) in self.lifetime.fields() {
            if !value.is_zero() {
                let _ = writeln!(out, "  {:<24} {:>16}", name, value.to_string());
            }
        }

        if !self.yearly.is_empty() {
            let _ = writeln!(
                out,
                "\n  {:<6} {:>14} {:>14} {:>8} {:>14} {:>16}",
                "Year", "Income", "Taxes", "Rate", "Cash flow", "Net worth"
            );
            for report in &self.yearly {
                let _ = writeln!(
                    out,
                    "  {:<6} {:>14} {:>14} {:>7.1}% {:>14} {:>16}",
                    report.period.year(),
                    report.total_income.to_string(),
                    report.total_taxes.to_string(),
                    report.effective_rate * 100.0,
                    report.cash_flow.to_string(),
                    report.net_worth.to_string()
                );
            }
        }
        out
    }
}

/// Tuned percentage per recurring rule, as `(source, target, pct)`.
pub fn tuned_rules(accounts: &[AccountSnapshot]) -> Vec<(String, String, f64)> {
    accounts
        .iter()
        .flat_map(|account| {
            account
                .transfers
                .iter()
                .filter(|rule| rule.frequency != flowplan_core::Frequency::None)
                .map(|rule| (account.name.clone(), rule.target.clone(), rule.recurring_pct))
        })
        .collect()
}

pub fn render_optimization(result: &OptimizationResult, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(result);
    }
    let mut out = String::new();
    let status = if result.completed { "complete" } else { "stopped early" };
    let _ = writeln!(out, "Optimizer {status} after {} generations", result.generations_run());
    let _ = writeln!(out, "Best terminal net worth: {}", Currency::new(result.fitness));
    let _ = writeln!(out, "\nTransfer rules");
    for (source, target, pct) in tuned_rules(&result.best) {
        let _ = writeln!(out, "  {source:<20} -> {target:<20} {pct:>6.2}%");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowplan_core::{Frequency, SimulationSettings, YearMonth, run_chronometer};

    fn run() -> RunReport {
        let start = YearMonth::new(2025, 1);
        let finish = YearMonth::new(2026, 12);
        let snapshots = [
            AccountSnapshot::new(InstrumentKind::Salary, "Job", start, finish)
                .balance(5_000.0)
                .transfer("Brokerage", Frequency::Monthly, 10.0, 0.0),
            AccountSnapshot::new(InstrumentKind::Brokerage, "Brokerage", start, finish).rate(0.05),
            AccountSnapshot::new(InstrumentKind::Cash, "Checking", start, finish),
        ];
        let settings = SimulationSettings {
            capture_reports: true,
            ..Default::default()
        };
        let mut portfolio = Portfolio::new(settings, &snapshots).unwrap();
        let summary = run_chronometer(&mut portfolio).unwrap();
        RunReport::from_portfolio(&portfolio, summary)
    }

    #[test]
    fn test_report_keeps_yearly_rows_only() {
        let report = run();
        assert_eq!(report.yearly.len(), 2);
        assert_eq!(report.accounts.len(), 3);
        assert!(report.lifetime.employed_income.amount() > 0.0);
    }

    #[test]
    fn test_text_lists_accounts_and_years() {
        let text = run().to_text();
        assert!(text.contains("Terminal net worth"));
        assert!(text.contains("Brokerage"));
        assert!(text.contains("2026"));
        assert!(text.contains("employed_income"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = run().render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["accounts"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["summary"]["months"], 24);
    }

    #[test]
    fn test_tuned_rules_skip_on_close_only() {
        let start = YearMonth::new(2025, 1);
        let accounts = [AccountSnapshot::new(InstrumentKind::Salary, "Job", start, start)
            .transfer("A", Frequency::Monthly, 30.0, 0.0)
            .transfer("B", Frequency::None, 0.0, 100.0)];
        assert_eq!(tuned_rules(&accounts), vec![("Job".to_string(), "A".to_string(), 30.0)]);
    }
}
