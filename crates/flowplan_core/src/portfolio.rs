//! Portfolio orchestration
//!
//! The portfolio owns the account arena (sorted by instrument priority, then
//! name), the name registry transfer rules bind against, the per-run
//! simulation context, and period totals. The chronometer calls its hooks
//! in a fixed order:
//!
//! - `close_year` (January 1, before the monthly hook)
//! - `begin_month` (day 1)
//! - `year_boundary` (January 1, after the monthly hook)
//! - `mid_month` (day 15)
//! - `end_month` (day 30)
//!
//! Nothing here returns an error mid-run: anomalies are logged and the run
//! continues with a safe default.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::account::{Account, LONG_TERM_MONTHS, Lifecycle, TAXABLE_SOCIAL_SECURITY};
use crate::calendar::CalendarPoint;
use crate::context::{SimulationContext, SimulationSettings};
use crate::error::SnapshotError;
use crate::metrics::Metric;
use crate::model::{
    AccountIndex, AccountSnapshot, Behavior, Granularity, InstrumentKind, PERCENT_EPSILON,
    PeriodReport, PeriodTotals, TaxTreatment, clamp_recurring, recurring_total,
};
use crate::money::{CENT, Currency};
use crate::reconcile::reconcile_memos;
use crate::taxes::{LimitGroup, TaxTable};

/// Months a home must be held before the sale exclusion applies.
pub const HOME_EXCLUSION_MONTHS: i32 = 24;

/// Year used for the context when a portfolio has no accounts.
const FALLBACK_YEAR: u16 = 2024;

/// Withdrawal needed to net `shortfall` after paying gains tax on it.
///
/// With unrealized-gain ratio `g = max(0, 1 - basis/balance)` and marginal
/// gains rate `t`, the withdrawal is `shortfall / (1 - t·g)`. A non-positive
/// denominator or an empty account returns the shortfall unchanged.
#[must_use]
pub fn gross_up_withdrawal(
    shortfall: Currency,
    basis: Currency,
    balance: Currency,
    gains_rate: f64,
) -> Currency {
    if shortfall <= Currency::ZERO {
        return Currency::ZERO;
    }
    if balance <= Currency::ZERO {
        return shortfall;
    }
    let gain_ratio = (1.0 - basis.amount() / balance.amount()).max(0.0);
    let denominator = 1.0 - gains_rate * gain_ratio;
    if denominator <= 0.0 {
        warn!(%shortfall, gains_rate, gain_ratio, "degenerate gross-up, withdrawing shortfall as is");
        return shortfall;
    }
    shortfall * (1.0 / denominator)
}

/// Tax bookkeeping for the current year.
#[derive(Debug, Clone, Copy, Default)]
struct TaxState {
    /// This month's taxable wages, annualized.
    annual_wages: Currency,
    /// Non-wage ordinary income already assessed this year.
    ordinary_ytd: Currency,
    long_term_ytd: Currency,
    /// Realized this month, settled at day 30.
    pending_ordinary: Currency,
    pending_long_term: Currency,
    /// Paid on the spot for shortfall withdrawals.
    gross_up_tax: Currency,
}

#[derive(Debug, Clone, Copy, Default)]
struct Paycheck {
    index: usize,
    gross: Currency,
    /// False for social security, which is taxed at settlement instead.
    wage: bool,
    fica: Currency,
    pre_tax: Currency,
    withholding: Currency,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    accounts: Vec<Account>,
    registry: FxHashMap<String, AccountIndex>,
    context: SimulationContext,
    first: Option<CalendarPoint>,
    last: Option<CalendarPoint>,

    month: PeriodTotals,
    year: PeriodTotals,
    lifetime: PeriodTotals,
    taxes: TaxState,
    reports: Vec<PeriodReport>,
    paychecks: Vec<Paycheck>,
    warned_no_expensable: bool,
}

impl Portfolio {
    /// Build from snapshot records. Names must be unique.
    pub fn new(settings: SimulationSettings, snapshots: &[AccountSnapshot]) -> Result<Self, SnapshotError> {
        let mut seen = FxHashSet::default();
        let mut accounts = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if !seen.insert(snapshot.name.as_str()) {
                return Err(SnapshotError::DuplicateName(snapshot.name.clone()));
            }
            accounts.push(Account::from_snapshot(snapshot)?);
        }
        accounts.sort_by(|a, b| {
            a.kind()
                .priority()
                .cmp(&b.kind().priority())
                .then_with(|| a.name().cmp(b.name()))
        });

        let registry = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name().to_owned(), AccountIndex(i)))
            .collect();
        let first = accounts.iter().map(|a| a.start().start()).min();
        let last = accounts.iter().map(|a| a.finish().end()).max();
        let first_year = first.map_or(FALLBACK_YEAR, CalendarPoint::year);

        Ok(Portfolio {
            accounts,
            registry,
            context: SimulationContext::new(settings, first_year),
            first,
            last,
            month: PeriodTotals::default(),
            year: PeriodTotals::default(),
            lifetime: PeriodTotals::default(),
            taxes: TaxState::default(),
            reports: Vec::new(),
            paychecks: Vec::new(),
            warned_no_expensable: false,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// First and last simulated points from the union of account windows.
    #[must_use]
    pub fn period(&self) -> Option<(CalendarPoint, CalendarPoint)> {
        match (self.first, self.last) {
            (Some(first), Some(last)) if first <= last => Some((first, last)),
            _ => None,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<AccountIndex> {
        self.registry.get(name).copied()
    }

    #[must_use]
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.index_of(name).map(|i| &self.accounts[i.0])
    }

    #[must_use]
    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    #[must_use]
    pub fn settings(&self) -> &SimulationSettings {
        &self.context.settings
    }

    pub fn set_capture_reports(&mut self, capture: bool) {
        self.context.settings.capture_reports = capture;
    }

    /// Reference-free records of every account, in portfolio order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<AccountSnapshot> {
        self.accounts.iter().map(Account::snapshot).collect()
    }

    #[must_use]
    pub fn month_totals(&self) -> &PeriodTotals {
        &self.month
    }

    #[must_use]
    pub fn year_totals(&self) -> &PeriodTotals {
        &self.year
    }

    #[must_use]
    pub fn lifetime_totals(&self) -> &PeriodTotals {
        &self.lifetime
    }

    #[must_use]
    pub fn reports(&self) -> &[PeriodReport] {
        &self.reports
    }

    /// Sum of non-flow balances; liabilities count negative.
    #[must_use]
    pub fn net_worth(&self) -> Currency {
        self.accounts
            .iter()
            .filter(|a| !a.kind().is_flow())
            .map(Account::balance)
            .sum()
    }

    // ------------------------------------------------------------------
    // Run setup
    // ------------------------------------------------------------------

    /// Reset every account and the context for a fresh run, bind transfer
    /// rules by name and scale over-allocated recurring percentages.
    pub fn initialize(&mut self) {
        let first_year = self.first.map_or(FALLBACK_YEAR, CalendarPoint::year);
        for account in &mut self.accounts {
            account.initialize();
        }
        self.context.reset(first_year);
        self.month = PeriodTotals::default();
        self.year = PeriodTotals::default();
        self.lifetime = PeriodTotals::default();
        self.taxes = TaxState::default();
        self.reports.clear();
        self.warned_no_expensable = false;

        self.bind_transfers();
        self.clamp_transfers();
        self.apply_historical_year(first_year);
    }

    fn bind_transfers(&mut self) {
        for index in 0..self.accounts.len() {
            for r in 0..self.accounts[index].transfers().len() {
                let rule = &mut self.accounts[index].transfers_mut()[r];
                let bound = rule.bind(&self.registry);
                if bound && rule.bound() != Some(AccountIndex(index)) {
                    continue;
                }
                rule.unbind();
                let account = &self.accounts[index];
                warn!(
                    account = %account.name(),
                    target = %account.transfers()[r].target(),
                    "transfer target unresolved, rule is a no-op"
                );
            }
        }
    }

    fn clamp_transfers(&mut self) {
        for account in &mut self.accounts {
            let total = recurring_total(account.transfers());
            if total > 100.0 + PERCENT_EPSILON && clamp_recurring(account.transfers_mut()) {
                warn!(account = %account.name(), total, "recurring transfers exceed 100%, scaled down");
            }
        }
    }

    /// Point every account's rate at the historical year mapped to `year`,
    /// or back at its configured rate when data has run out.
    pub fn apply_historical_year(&mut self, year: u16) {
        let Some(backtest) = &self.context.backtest else {
            return;
        };
        for account in &mut self.accounts {
            account.set_rate_override(backtest.rate(account.kind().return_class(), year));
        }
        self.context.inflation = backtest
            .inflation(year)
            .unwrap_or(self.context.settings.inflation_rate);
    }

    // ------------------------------------------------------------------
    // Checkpoint hooks
    // ------------------------------------------------------------------

    /// Day 1.
    pub fn begin_month(&mut self, point: CalendarPoint) {
        self.month = PeriodTotals::default();
        for account in &mut self.accounts {
            account.open_month();
        }

        // lifecycle flags and opening balances
        let mut closing = Vec::new();
        for (i, account) in self.accounts.iter_mut().enumerate() {
            if account.refresh(point) {
                closing.push(i);
            } else if account.is_active() {
                account.start_if_due(point);
            }
        }
        for i in closing {
            self.close_account(i, point);
        }

        self.recognize_paychecks(point);
        self.run_asset_rules(point);
    }

    /// Day 15.
    pub fn mid_month(&mut self, _point: CalendarPoint) {
        for account in &mut self.accounts {
            if account.is_active() && account.kind() == InstrumentKind::Home {
                account.accrue_escrow();
            }
        }
    }

    /// Day 30.
    pub fn end_month(&mut self, point: CalendarPoint) {
        for i in 0..self.accounts.len() {
            if self.accounts[i].is_active() && self.accounts[i].kind().is_outflow() {
                self.settle_outflow(i, point);
            }
        }

        for i in 0..self.accounts.len() {
            if !self.accounts[i].is_active() {
                continue;
            }
            let effects = self.accounts[i].month_end(point, &self.context);
            let account = &mut self.accounts[i];
            let kind = account.kind();
            let taxable = kind.tax_treatment() == TaxTreatment::Taxable;

            self.month.growth += effects.growth;
            if taxable {
                self.month.dividend_income += effects.dividend;
                self.month.interest_income += effects.interest;
                self.taxes.pending_ordinary += effects.interest;
            } else {
                self.month.growth += effects.dividend + effects.interest;
            }

            if taxable && kind.behavior() == Behavior::Capital && kind != InstrumentKind::Home {
                let estimated = (effects.growth + effects.dividend).positive_part()
                    * account.tax_rate().value();
                if estimated > Currency::ZERO {
                    account.apply(point, Metric::EstimatedTax, estimated.flip_sign());
                    self.month.estimated_tax += estimated;
                }
            }
        }

        self.settle_taxes(point);
        self.check_month_balances(point);

        if self.context.settings.capture_reports {
            let report = PeriodReport::new(point, Granularity::Monthly, self.month, self.net_worth());
            self.reports.push(report);
        }
        self.year.add(&self.month);
        self.lifetime.add(&self.month);
    }

    /// January 1, before the monthly hook: close the books on the year that
    /// just ended and inflate the tax table.
    pub fn close_year(&mut self, point: CalendarPoint) {
        let ended = point.year().saturating_sub(1);
        self.finish_year_books(CalendarPoint::month_end(ended, 12));

        for account in &mut self.accounts {
            account.roll_year();
        }
        self.taxes = TaxState::default();
        self.year = PeriodTotals::default();
        self.context.tax.inflate(self.context.inflation);
        self.apply_historical_year(point.year());
    }

    /// January 1, after the monthly hook.
    pub fn year_boundary(&mut self, point: CalendarPoint) {
        for account in &mut self.accounts {
            if !account.is_active() {
                continue;
            }
            if !matches!(account.lifecycle(), Lifecycle::Active { on_start: true, .. }) {
                account.yearly(point, &self.context);
            }
            account.reassess_escrow();
        }
        self.context.user.age_one_year();
    }

    /// After the last checkpoint: close the final year's books and drop
    /// historical overrides.
    pub fn finish_run(&mut self, last: CalendarPoint) {
        self.finish_year_books(last);
        for account in &mut self.accounts {
            account.set_rate_override(None);
        }
    }

    fn finish_year_books(&mut self, period: CalendarPoint) {
        if self.context.settings.capture_reports {
            let report = PeriodReport::new(period, Granularity::Yearly, self.year, self.net_worth());
            self.reports.push(report);
        }
        reconcile_memos(&mut self.accounts, &self.year, period.year());
        self.log_yearly_liability(period.year());
    }

    /// What the current year's income would owe in one lump, and what was
    /// withheld, settled and paid on shortfall withdrawals month by month.
    pub(crate) fn yearly_liability(&self) -> (Currency, Currency) {
        let totals = &self.year;
        let table = &self.context.tax;
        let ordinary = totals.wages() - totals.pre_tax_contributions
            + totals.social_security_income * TAXABLE_SOCIAL_SECURITY
            + totals.interest_income
            + totals.distributions
            + totals.short_term_gains;
        let taxable = ordinary.amount() - table.standard_deduction();
        let liability = table.yearly_income_tax(taxable)
            + long_term_tax(table, taxable, totals.long_term_gains.amount());
        let paid = totals.income_tax + totals.capital_gains_tax + self.taxes.gross_up_tax;
        (Currency::new(liability), paid)
    }

    fn log_yearly_liability(&self, year: u16) {
        let (liability, paid) = self.yearly_liability();
        debug!(
            year,
            %liability,
            %paid,
            difference = %(liability - paid),
            "yearly tax liability"
        );
    }

    // ------------------------------------------------------------------
    // Day-1 pipeline
    // ------------------------------------------------------------------

    fn recognize_paychecks(&mut self, point: CalendarPoint) {
        let mut paychecks = std::mem::take(&mut self.paychecks);
        paychecks.clear();

        // priority order: liabilities schedule payments, income is recognized
        for i in 0..self.accounts.len() {
            if !self.accounts[i].is_active() {
                continue;
            }
            let effects = self.accounts[i].day_one(point, &self.context);
            if effects.income <= Currency::ZERO {
                continue;
            }
            let wage = match self.accounts[i].income_metric() {
                Metric::SocialSecurityIncome => {
                    self.month.social_security_income += effects.income;
                    self.taxes.pending_ordinary += effects.income * TAXABLE_SOCIAL_SECURITY;
                    false
                }
                Metric::SelfEmployedIncome => {
                    self.month.self_employed_income += effects.income;
                    true
                }
                _ => {
                    self.month.employed_income += effects.income;
                    true
                }
            };
            paychecks.push(Paycheck {
                index: i,
                gross: effects.income,
                wage,
                ..Default::default()
            });
        }

        // fixed withholding
        for paycheck in paychecks.iter_mut().filter(|p| p.wage) {
            let account = &mut self.accounts[paycheck.index];
            let fica = self
                .context
                .tax
                .fica_tax(paycheck.gross, account.wages_ytd(), account.is_self_employed());
            account.add_wages(paycheck.gross);
            account.note(point, Metric::Fica, fica.total().flip_sign());
            self.month.fica += fica.total();
            paycheck.fica = fica.total();
        }

        for paycheck in paychecks.iter_mut().filter(|p| p.wage) {
            paycheck.pre_tax = self.contribute_pre_tax(point, paycheck.index, paycheck.gross);
        }
        self.withhold_income_tax(point, &mut paychecks);
        self.distribute_rmds(point);

        for paycheck in &paychecks {
            let net = paycheck.gross - paycheck.fica - paycheck.withholding - paycheck.pre_tax;
            self.route_net_income(point, paycheck.index, net.positive_part());
        }
        self.paychecks = paychecks;
    }

    /// Rules into tax-deferred targets take their share of gross pay,
    /// clipped by the target's remaining annual limit.
    fn contribute_pre_tax(&mut self, point: CalendarPoint, index: usize, gross: Currency) -> Currency {
        let month = point.month();
        let age = self.context.user.age;
        let mut total = Currency::ZERO;

        for r in 0..self.accounts[index].transfers().len() {
            let Some(target) = self.accounts[index].transfers()[r].bound() else {
                continue;
            };
            let target_account = &self.accounts[target.0];
            if !target_account.is_active() || !TaxTable::is_pre_tax_target(target_account.kind()) {
                continue;
            }
            let cap = self.contribution_room(target.0, age);

            let rule = &mut self.accounts[index].transfers_mut()[r];
            rule.set_cap(cap);
            let amount = rule.recurring_amount(gross, month).min(gross - total);
            if amount > Currency::ZERO {
                self.move_funds(point, index, target.0, amount, false);
                total += amount;
            }
        }
        total
    }

    /// Annualize this month's taxable wages, apply the standard deduction,
    /// and spread one twelfth of the yearly tax over paychecks pro rata.
    fn withhold_income_tax(&mut self, point: CalendarPoint, paychecks: &mut [Paycheck]) {
        let taxable: Currency = paychecks
            .iter()
            .filter(|p| p.wage)
            .map(|p| (p.gross - p.pre_tax).positive_part())
            .sum();
        self.taxes.annual_wages = taxable * 12.0;
        if taxable <= Currency::ZERO {
            return;
        }

        let table = &self.context.tax;
        let yearly = table.yearly_income_tax(self.taxes.annual_wages.amount() - table.standard_deduction());
        let monthly = Currency::new(yearly / 12.0);

        for paycheck in paychecks.iter_mut().filter(|p| p.wage) {
            let share = (paycheck.gross - paycheck.pre_tax).positive_part().amount() / taxable.amount();
            paycheck.withholding = monthly * share;
            self.accounts[paycheck.index].note(point, Metric::IncomeTax, paycheck.withholding.flip_sign());
            self.month.income_tax += paycheck.withholding;
        }
    }

    fn distribute_rmds(&mut self, point: CalendarPoint) {
        if !self.context.rmd_eligible() {
            return;
        }
        let age = self.context.user.age;
        for i in 0..self.accounts.len() {
            let account = &self.accounts[i];
            if !account.is_active() || account.kind().tax_treatment() != TaxTreatment::TaxDeferred {
                continue;
            }
            let rmd = self
                .context
                .tax
                .monthly_rmd(account.prior_year_balance(), age)
                .min(account.balance().positive_part());
            if rmd <= Currency::ZERO {
                continue;
            }

            self.accounts[i].debit(point, rmd, Metric::Rmd, false);
            self.month.rmd += rmd;
            self.month.distributions += rmd;
            self.taxes.pending_ordinary += rmd;
            match self.first_expensable(None) {
                Some(dest) => {
                    self.accounts[dest].credit(point, rmd, Metric::Rmd, false);
                }
                None => self.warn_no_expensable(),
            }
        }
    }

    /// Post-tax rules take their share of net pay; the rest lands in the
    /// first expensable account.
    fn route_net_income(&mut self, point: CalendarPoint, index: usize, net: Currency) {
        let month = point.month();
        let age = self.context.user.age;
        let mut remaining = net;

        for r in 0..self.accounts[index].transfers().len() {
            let Some(target) = self.accounts[index].transfers()[r].bound() else {
                continue;
            };
            let target_account = &self.accounts[target.0];
            if !target_account.is_active() || TaxTable::is_pre_tax_target(target_account.kind()) {
                continue;
            }
            let cap = self.contribution_room(target.0, age);

            let rule = &mut self.accounts[index].transfers_mut()[r];
            rule.set_cap(cap);
            let amount = rule.recurring_amount(net, month).min(remaining);
            if amount > Currency::ZERO {
                self.move_funds(point, index, target.0, amount, false);
                remaining -= amount;
            }
        }

        if remaining <= Currency::ZERO {
            return;
        }
        match self.first_expensable(None) {
            Some(dest) => {
                self.accounts[index].debit(point, remaining, Metric::NetIncome, false);
                self.accounts[dest].credit(point, remaining, Metric::NetIncome, false);
            }
            None => self.warn_no_expensable(),
        }
    }

    /// Recurring rules on holdings move a share of the balance when due.
    fn run_asset_rules(&mut self, point: CalendarPoint) {
        let month = point.month();
        for i in 0..self.accounts.len() {
            let account = &self.accounts[i];
            let kind = account.kind();
            if !account.is_active() || kind.is_flow() || kind.is_outflow() {
                continue;
            }
            let base = account.balance().positive_part();
            for r in 0..self.accounts[i].transfers().len() {
                let rule = &self.accounts[i].transfers()[r];
                let Some(target) = rule.bound() else {
                    continue;
                };
                let amount = rule
                    .recurring_amount(base, month)
                    .min(self.accounts[i].balance().positive_part());
                if amount > Currency::ZERO && self.accounts[target.0].is_active() {
                    self.move_funds(point, i, target.0, amount, false);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Day-30 pipeline
    // ------------------------------------------------------------------

    /// Fund an outflow account's required payment through its rules, cover
    /// any remainder, then book the payment on the account itself.
    fn settle_outflow(&mut self, index: usize, point: CalendarPoint) {
        let kind = self.accounts[index].kind();
        let required = if kind == InstrumentKind::Home {
            self.accounts[index].take_escrow()
        } else {
            self.accounts[index].required_outflow()
        };
        let label = if kind == InstrumentKind::Expense {
            Metric::Expense
        } else {
            Metric::TransferOut
        };

        if required > Currency::ZERO {
            let month = point.month();
            let mut remaining = required;
            for r in 0..self.accounts[index].transfers().len() {
                let rule = &self.accounts[index].transfers()[r];
                let Some(source) = rule.bound() else {
                    continue;
                };
                let share = rule.recurring_amount(required, month).min(remaining);
                if share <= Currency::ZERO || !self.accounts[source.0].is_active() {
                    continue;
                }
                self.withdraw(point, source.0, share, label, false);
                remaining -= share;
            }
            if remaining.amount() > CENT {
                self.cover_shortfall(point, remaining, label);
            }
        }

        match kind.behavior() {
            Behavior::RecurringExpense => {
                self.accounts[index].debit(point, required, Metric::Expense, false);
                self.month.expenses += required;
            }
            Behavior::Amortizing => {
                let payment = self.accounts[index].settle_payment(point);
                self.month.mortgage_interest += payment.interest;
                self.month.mortgage_principal += payment.principal;
            }
            _ if required > Currency::ZERO => {
                self.accounts[index].note(point, Metric::PropertyTax, required.flip_sign());
                self.month.property_tax += required;
            }
            _ => {}
        }
    }

    /// Withdraw a grossed-up amount from the first taxable brokerage so the
    /// shortfall is met after gains tax; that tax is paid on the spot and
    /// booked as estimated tax. Anything left comes out of the first
    /// expensable account.
    fn cover_shortfall(&mut self, point: CalendarPoint, shortfall: Currency, label: Metric) {
        let mut remaining = shortfall;

        if let Some(source) = self.first_taxable_capital() {
            let balance = self.accounts[source].balance();
            let basis = self.accounts[source].basis();
            let long_term = self.accounts[source].held_months(point) >= LONG_TERM_MONTHS;
            let rate = self.marginal_rate_for(long_term);
            let withdrawal = gross_up_withdrawal(remaining, basis, balance, rate).min(balance);

            let result = self.accounts[source].debit(point, withdrawal, label, false);
            let mut tax = Currency::ZERO;
            if !result.realized_gain.is_zero() {
                let gain = result.realized_gain;
                self.record_gain(point, source, gain, result.long_term);
                // assessed here, so later gains stack above it
                let (ordinary_tax, gains_tax) = if result.long_term {
                    self.assess(Currency::ZERO, gain)
                } else {
                    self.assess(gain, Currency::ZERO)
                };
                tax = ordinary_tax + gains_tax;
            }
            if tax > Currency::ZERO {
                self.accounts[source].note(point, Metric::EstimatedTax, tax.flip_sign());
                self.month.estimated_tax += tax;
                self.taxes.gross_up_tax += tax;
            }
            remaining -= withdrawal - tax;
        }

        if remaining.amount() > CENT {
            self.pay_from_expensable(point, remaining, label);
        }
    }

    /// Tax this month's non-wage income at the marginal rate above wages
    /// and earlier income, and debit it from the first expensable account.
    fn settle_taxes(&mut self, point: CalendarPoint) {
        let ordinary = std::mem::take(&mut self.taxes.pending_ordinary);
        let long_term = std::mem::take(&mut self.taxes.pending_long_term);
        if ordinary.is_zero() && long_term.is_zero() {
            return;
        }
        let (ordinary_tax, gains_tax) = self.assess(ordinary, long_term);
        self.month.income_tax += ordinary_tax;
        self.month.capital_gains_tax += gains_tax;
        self.pay_from_expensable(point, ordinary_tax, Metric::IncomeTax);
        self.pay_from_expensable(point, gains_tax, Metric::CapitalGainsTax);
    }

    fn check_month_balances(&self, point: CalendarPoint) {
        for account in &self.accounts {
            if account.is_closed() && !account.balance().is_zero() {
                warn!(account = %account.name(), balance = %account.balance(), %point, "closed account holds a balance");
            }
            if let Some(error) = account.month_balance_error() {
                warn!(account = %account.name(), %error, %point, "month balance does not reconcile");
            }
        }
    }

    // ------------------------------------------------------------------
    // Closure
    // ------------------------------------------------------------------

    /// Realize gains, pay their tax out of the balance, run on-close rules
    /// and zero the account.
    fn close_account(&mut self, index: usize, point: CalendarPoint) {
        let kind = self.accounts[index].kind();
        if kind.is_flow() {
            self.accounts[index].mark_closed(point);
            return;
        }

        let position = self.accounts[index].closing_position(point);
        let mut proceeds = position.balance;

        if kind.tracks_basis() && kind.behavior() == Behavior::Capital {
            let mut gain = position.balance - position.basis;
            if kind == InstrumentKind::Home
                && position.held_months > HOME_EXCLUSION_MONTHS
                && gain > Currency::ZERO
            {
                let exclusion = Currency::new(self.context.tax.home_exclusion());
                gain = (gain - exclusion).positive_part();
            }
            if !gain.is_zero() {
                let long_term = position.held_months >= LONG_TERM_MONTHS;
                self.record_gain(point, index, gain, long_term);
                let (ordinary_tax, gains_tax) = if long_term {
                    self.assess(Currency::ZERO, gain)
                } else {
                    self.assess(gain, Currency::ZERO)
                };
                if ordinary_tax > Currency::ZERO {
                    self.accounts[index].apply(point, Metric::IncomeTax, ordinary_tax.flip_sign());
                    self.month.income_tax += ordinary_tax;
                }
                if gains_tax > Currency::ZERO {
                    self.accounts[index].apply(point, Metric::CapitalGainsTax, gains_tax.flip_sign());
                    self.month.capital_gains_tax += gains_tax;
                }
                proceeds -= ordinary_tax + gains_tax;
            }
        }

        if proceeds > Currency::ZERO {
            let mut remaining = proceeds;
            for r in 0..self.accounts[index].transfers().len() {
                let rule = &self.accounts[index].transfers()[r];
                let Some(target) = rule.bound() else {
                    continue;
                };
                let amount = rule.on_close_amount(proceeds).min(remaining);
                if amount > Currency::ZERO && self.accounts[target.0].is_active() {
                    self.move_funds(point, index, target.0, amount, true);
                    remaining -= amount;
                }
            }
            if remaining.amount() > CENT {
                match self.first_expensable(Some(index)) {
                    Some(dest) => self.move_funds(point, index, dest, remaining, true),
                    None => self.warn_no_expensable(),
                }
            }
        } else if proceeds < Currency::ZERO {
            // outstanding liability is paid off from cash
            let payoff = proceeds.flip_sign();
            self.pay_from_expensable(point, payoff, Metric::Closing);
            self.accounts[index].credit(point, payoff, Metric::Closing, true);
        }

        self.accounts[index].mark_closed(point);
    }

    // ------------------------------------------------------------------
    // Money movement helpers
    // ------------------------------------------------------------------

    /// Debit a funding account for spending. Realized gains and taxable
    /// distributions join this month's settlement.
    fn withdraw(
        &mut self,
        point: CalendarPoint,
        from: usize,
        amount: Currency,
        label: Metric,
        skip_gain_recognition: bool,
    ) {
        let result = self.accounts[from].debit(point, amount, label, skip_gain_recognition);
        if !result.realized_gain.is_zero() {
            self.record_gain(point, from, result.realized_gain, result.long_term);
            self.pool_gain(result.realized_gain, result.long_term);
        }
        if self.accounts[from].kind().tax_treatment() == TaxTreatment::TaxDeferred {
            self.month.distributions += amount;
            self.taxes.pending_ordinary += amount;
        }
    }

    /// Move money between two accounts.
    fn move_funds(
        &mut self,
        point: CalendarPoint,
        from: usize,
        to: usize,
        amount: Currency,
        skip_gain_recognition: bool,
    ) {
        if amount <= Currency::ZERO {
            return;
        }
        let from_kind = self.accounts[from].kind();
        let to_kind = self.accounts[to].kind();

        let result = self.accounts[from].debit(point, amount, Metric::TransferOut, skip_gain_recognition);
        self.accounts[to].credit(point, amount, Metric::TransferIn, false);

        if !result.realized_gain.is_zero() {
            self.record_gain(point, from, result.realized_gain, result.long_term);
            self.pool_gain(result.realized_gain, result.long_term);
        }
        let from_deferred = from_kind.tax_treatment() == TaxTreatment::TaxDeferred;
        let to_deferred = to_kind.tax_treatment() == TaxTreatment::TaxDeferred;
        if from_deferred && !to_deferred {
            self.month.distributions += amount;
            self.taxes.pending_ordinary += amount;
        }
        if from_kind.behavior() == Behavior::RecurringIncome {
            match to_kind.tax_treatment() {
                TaxTreatment::TaxDeferred => self.month.pre_tax_contributions += amount,
                TaxTreatment::TaxFree => self.month.tax_free_contributions += amount,
                _ => self.month.savings += amount,
            }
        }
    }

    fn record_gain(&mut self, point: CalendarPoint, index: usize, gain: Currency, long_term: bool) {
        let label = if long_term {
            self.month.long_term_gains += gain;
            Metric::LongTermGain
        } else {
            self.month.short_term_gains += gain;
            Metric::ShortTermGain
        };
        self.accounts[index].note(point, label, gain);
    }

    /// Short-term gains are ordinary income; long-term gains use the gains
    /// brackets. This holds on every path.
    fn pool_gain(&mut self, gain: Currency, long_term: bool) {
        if long_term {
            self.taxes.pending_long_term += gain;
        } else {
            self.taxes.pending_ordinary += gain;
        }
    }

    fn pay_from_expensable(&mut self, point: CalendarPoint, amount: Currency, label: Metric) {
        if amount <= Currency::ZERO {
            return;
        }
        match self.first_expensable(None) {
            Some(dest) => {
                self.accounts[dest].debit(point, amount, label, false);
            }
            None => self.warn_no_expensable(),
        }
    }

    fn first_expensable(&self, exclude: Option<usize>) -> Option<usize> {
        self.accounts
            .iter()
            .enumerate()
            .find(|(i, a)| Some(*i) != exclude && a.is_active() && a.kind().is_expensable())
            .map(|(i, _)| i)
    }

    fn first_taxable_capital(&self) -> Option<usize> {
        self.accounts
            .iter()
            .position(|a| a.is_active() && a.kind().is_taxable_capital() && a.balance() > Currency::ZERO)
    }

    fn warn_no_expensable(&mut self) {
        if !self.warned_no_expensable {
            warn!("no active cash or savings account to absorb flows");
            self.warned_no_expensable = true;
        }
    }

    // ------------------------------------------------------------------
    // Tax helpers
    // ------------------------------------------------------------------

    /// Ordinary taxable income so far: annualized wages plus non-wage
    /// income already assessed, less the standard deduction. May be negative.
    fn ordinary_base(&self) -> f64 {
        self.taxes.annual_wages.amount() + self.taxes.ordinary_ytd.amount()
            - self.context.tax.standard_deduction()
    }

    /// Rate the next dollar of realized gain would pay: ordinary for short
    /// term, the gains brackets above ordinary income and earlier gains for
    /// long term.
    fn marginal_rate_for(&self, long_term: bool) -> f64 {
        let table = &self.context.tax;
        let base = self.ordinary_base();
        if long_term {
            table.marginal_gains_rate((base + self.taxes.long_term_ytd.amount()).max(0.0))
        } else {
            table.marginal_income_rate(base)
        }
    }

    /// Room left this year under the limit `target` shares with the other
    /// accounts in its limit group.
    fn contribution_room(&self, target: usize, age: u8) -> Option<Currency> {
        let kind = self.accounts[target].kind();
        let limit = self.context.tax.contribution_limit(kind, age)?;
        let group = LimitGroup::of(kind);
        let used: Currency = self
            .accounts
            .iter()
            .filter(|a| LimitGroup::of(a.kind()) == group)
            .map(Account::contributions_ytd)
            .sum();
        Some((limit - used).positive_part())
    }

    /// Marginal tax on new income stacked above everything assessed so far.
    fn assess(&mut self, ordinary: Currency, long_term: Currency) -> (Currency, Currency) {
        let table = &self.context.tax;
        let base = self.ordinary_base();
        let stacked = base + ordinary.amount();
        let ordinary_tax = (table.yearly_income_tax(stacked) - table.yearly_income_tax(base)).max(0.0);

        let prior = self.taxes.long_term_ytd.amount();
        let gains_tax = (long_term_tax(table, stacked, prior + long_term.amount())
            - long_term_tax(table, stacked, prior))
        .max(0.0);

        self.taxes.ordinary_ytd += ordinary;
        self.taxes.long_term_ytd += long_term;
        (Currency::new(ordinary_tax), Currency::new(gains_tax))
    }
}

/// Long-term gains tax where unused deduction (negative ordinary income)
/// first shelters part of the gains.
fn long_term_tax(table: &TaxTable, ordinary: f64, gains: f64) -> f64 {
    if ordinary < 0.0 {
        table.yearly_long_term_gains_tax(0.0, (gains + ordinary).max(0.0))
    } else {
        table.yearly_long_term_gains_tax(ordinary, gains.max(0.0))
    }
}
