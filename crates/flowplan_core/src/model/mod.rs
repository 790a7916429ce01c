mod ids;
mod kind;
mod memo;
mod rmd;
mod snapshot;
mod totals;
mod transfer;

pub use ids::AccountIndex;
pub use kind::{Behavior, InstrumentKind, InstrumentTraits, ReturnClass, TaxTreatment};
pub use memo::Memo;
pub use rmd::{RmdTable, RmdTableEntry};
pub use snapshot::AccountSnapshot;
pub use totals::{Granularity, PeriodReport, PeriodTotals};
pub use transfer::{
    Frequency, FundTransferRule, PERCENT_EPSILON, TransferSnapshot, clamp_recurring,
    recurring_total,
};
