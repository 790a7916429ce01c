//! Period totals and reports
//!
//! `PeriodTotals` is a flat bag of named currency fields aggregated by the
//! portfolio at month, year and lifetime granularity. `PeriodReport` is the
//! read-only view handed to callers; capturing reports never feeds back into
//! the simulation.

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarPoint;
use crate::money::Currency;

macro_rules! period_totals {
    ($($(#[$doc:meta])* $field:ident),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        pub struct PeriodTotals {
            $($(#[$doc])* pub $field: Currency,)+
        }

        impl PeriodTotals {
            /// Field-wise sum.
            pub fn add(&mut self, other: &PeriodTotals) {
                $(self.$field += other.$field;)+
            }

            /// Field-wise difference.
            pub fn subtract(&mut self, other: &PeriodTotals) {
                $(self.$field -= other.$field;)+
            }

            /// Scale every field.
            pub fn multiply(&mut self, factor: f64) {
                $(self.$field = self.$field * factor;)+
            }

            /// Field names paired with values, in declaration order.
            #[must_use]
            pub fn fields(&self) -> Vec<(&'static str, Currency)> {
                vec![$((stringify!($field), self.$field)),+]
            }
        }
    };
}

period_totals! {
    employed_income,
    self_employed_income,
    social_security_income,
    interest_income,
    dividend_income,
    /// Withdrawals from tax-deferred accounts, RMDs included.
    distributions,
    rmd,
    short_term_gains,
    long_term_gains,
    growth,
    pre_tax_contributions,
    tax_free_contributions,
    /// After-tax transfers into taxable holdings.
    savings,
    fica,
    income_tax,
    capital_gains_tax,
    estimated_tax,
    property_tax,
    mortgage_interest,
    mortgage_principal,
    expenses,
}

impl PeriodTotals {
    #[must_use]
    pub fn wages(&self) -> Currency {
        self.employed_income + self.self_employed_income
    }

    #[must_use]
    pub fn total_income(&self) -> Currency {
        self.wages()
            + self.social_security_income
            + self.interest_income
            + self.dividend_income
            + self.distributions
            + self.short_term_gains
            + self.long_term_gains
    }

    #[must_use]
    pub fn total_taxes(&self) -> Currency {
        self.fica + self.income_tax + self.capital_gains_tax + self.estimated_tax + self.property_tax
    }

    /// Taxes as a fraction of income; zero when there is no income.
    #[must_use]
    pub fn effective_rate(&self) -> f64 {
        let income = self.total_income().amount();
        if income <= 0.0 {
            0.0
        } else {
            self.total_taxes().amount() / income
        }
    }

    #[must_use]
    pub fn cash_flow(&self) -> Currency {
        self.total_income()
            - self.total_taxes()
            - self.expenses
            - self.mortgage_interest
            - self.mortgage_principal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Monthly,
    Yearly,
}

/// Closed-period summary with derived totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: CalendarPoint,
    pub granularity: Granularity,
    pub totals: PeriodTotals,
    pub total_income: Currency,
    pub total_taxes: Currency,
    pub effective_rate: f64,
    pub cash_flow: Currency,
    pub net_worth: Currency,
}

impl PeriodReport {
    #[must_use]
    pub fn new(
        period: CalendarPoint,
        granularity: Granularity,
        totals: PeriodTotals,
        net_worth: Currency,
    ) -> Self {
        PeriodReport {
            period,
            granularity,
            total_income: totals.total_income(),
            total_taxes: totals.total_taxes(),
            effective_rate: totals.effective_rate(),
            cash_flow: totals.cash_flow(),
            totals,
            net_worth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_subtract_multiply() {
        let mut a = PeriodTotals {
            employed_income: Currency::new(1_000.0),
            fica: Currency::new(76.5),
            ..Default::default()
        };
        let b = PeriodTotals {
            employed_income: Currency::new(500.0),
            expenses: Currency::new(200.0),
            ..Default::default()
        };

        a.add(&b);
        assert_eq!(a.employed_income, Currency::new(1_500.0));
        assert_eq!(a.expenses, Currency::new(200.0));

        a.subtract(&b);
        assert_eq!(a.employed_income, Currency::new(1_000.0));
        assert_eq!(a.expenses, Currency::ZERO);

        a.multiply(12.0);
        assert_eq!(a.employed_income, Currency::new(12_000.0));
        assert_eq!(a.fica, Currency::new(918.0));
    }

    #[test]
    fn test_derived_totals() {
        let totals = PeriodTotals {
            employed_income: Currency::new(10_000.0),
            interest_income: Currency::new(100.0),
            fica: Currency::new(765.0),
            income_tax: Currency::new(1_235.0),
            expenses: Currency::new(3_000.0),
            mortgage_interest: Currency::new(1_000.0),
            mortgage_principal: Currency::new(500.0),
            ..Default::default()
        };

        assert_eq!(totals.total_income(), Currency::new(10_100.0));
        assert_eq!(totals.total_taxes(), Currency::new(2_000.0));
        assert!((totals.effective_rate() - 2_000.0 / 10_100.0).abs() < 1e-12);
        assert_eq!(totals.cash_flow(), Currency::new(3_600.0));
    }

    #[test]
    fn test_effective_rate_without_income() {
        assert_eq!(PeriodTotals::default().effective_rate(), 0.0);
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let fields = PeriodTotals::default().fields();
        assert_eq!(fields.first().map(|f| f.0), Some("employed_income"));
        assert_eq!(fields.last().map(|f| f.0), Some("expenses"));
    }
}
