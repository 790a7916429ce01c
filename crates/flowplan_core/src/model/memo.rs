//! Immutable dated memos recorded by accounts

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarPoint;
use crate::metrics::Metric;
use crate::money::Currency;

/// One balance-affecting (or informational) event on an account.
///
/// `balance_delta` is what the event did to the balance; `amount` is the
/// value booked under `label`. They differ for flow accounts, whose credits
/// and debits are recorded but never move the formula-driven balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub point: CalendarPoint,
    pub label: Metric,
    pub amount: Currency,
    pub balance_delta: Currency,
}

impl Memo {
    #[must_use]
    pub fn balance_change(point: CalendarPoint, label: Metric, delta: Currency) -> Self {
        Memo {
            point,
            label,
            amount: delta,
            balance_delta: delta,
        }
    }

    #[must_use]
    pub fn note(point: CalendarPoint, label: Metric, amount: Currency) -> Self {
        Memo {
            point,
            label,
            amount,
            balance_delta: Currency::ZERO,
        }
    }
}
