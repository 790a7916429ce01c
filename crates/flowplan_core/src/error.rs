use thiserror::Error;

use crate::calendar::YearMonth;

/// Problems with an account record supplied by a caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("account name must not be empty")]
    EmptyName,
    #[error("account {name:?} has an invalid window {start} .. {finish}")]
    InvalidWindow {
        name: String,
        start: YearMonth,
        finish: YearMonth,
    },
    #[error("account {0:?} is an amortizing liability without a remaining term")]
    MissingTerm(String),
    #[error("duplicate account name {0:?}")]
    DuplicateName(String),
}

/// Reasons a chronometer run did not start.
///
/// These abort only the outer run; nothing fails part-way through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("portfolio has no accounts")]
    NoAccounts,
    #[error("could not resolve the simulated period from account windows")]
    UnresolvedPeriod,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("no recurring transfer rules on income or expense accounts to tune")]
    NoGenes,
    #[error("invalid optimizer configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Run(#[from] RunError),
}
