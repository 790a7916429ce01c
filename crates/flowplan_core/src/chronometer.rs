//! Checkpoint clock
//!
//! Drives a portfolio over the union of its account windows, three
//! checkpoints per month: day 1, day 15 and day 30. Every month is treated
//! as having a day 30, so February included.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::{CalendarPoint, Checkpoint};
use crate::error::RunError;
use crate::money::Currency;
use crate::portfolio::Portfolio;

/// What one run covered and where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub first: CalendarPoint,
    pub last: CalendarPoint,
    pub checkpoints: u32,
    pub months: u32,
    pub terminal_value: Currency,
}

/// Run the portfolio from its first start checkpoint through its last
/// finish checkpoint.
///
/// The portfolio is re-initialized first, so the same portfolio can be run
/// any number of times. Only an empty portfolio or an unresolvable period
/// aborts the run.
pub fn run_chronometer(portfolio: &mut Portfolio) -> Result<RunSummary, RunError> {
    if portfolio.is_empty() {
        warn!("nothing to simulate: portfolio has no accounts");
        return Err(RunError::NoAccounts);
    }
    let Some((first, last)) = portfolio.period() else {
        warn!("could not resolve the simulated period");
        return Err(RunError::UnresolvedPeriod);
    };

    portfolio.initialize();
    debug!(%first, %last, accounts = portfolio.accounts().len(), "chronometer starting");

    let mut checkpoints = 0;
    let mut months = 0;
    let mut point = first;
    while point <= last {
        if advance(portfolio, point, first) == Some(Checkpoint::EndOfMonth) {
            months += 1;
        }
        checkpoints += 1;
        point = point.next_checkpoint();
    }

    portfolio.finish_run(last);

    let summary = RunSummary {
        first,
        last,
        checkpoints,
        months,
        terminal_value: portfolio.net_worth(),
    };
    info!(
        %first,
        %last,
        months,
        terminal_value = %summary.terminal_value,
        "simulation complete"
    );
    Ok(summary)
}

/// Call the portfolio hooks for one checkpoint, in order, and return which
/// checkpoint `point` was.
pub(crate) fn advance(portfolio: &mut Portfolio, point: CalendarPoint, first: CalendarPoint) -> Option<Checkpoint> {
    let checkpoint = point.checkpoint();
    match checkpoint {
        Some(Checkpoint::StartOfMonth) => {
            // settings describe the first year, so it gets no yearly hooks
            let new_year = point.is_new_year() && point != first;
            if new_year {
                portfolio.close_year(point);
            }
            portfolio.begin_month(point);
            if new_year {
                portfolio.year_boundary(point);
            }
        }
        Some(Checkpoint::MidMonth) => portfolio.mid_month(point),
        Some(Checkpoint::EndOfMonth) => portfolio.end_month(point),
        None => {}
    }
    checkpoint
}
