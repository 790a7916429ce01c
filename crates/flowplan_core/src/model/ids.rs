//! Arena indices for simulation entities

use std::fmt;

/// Position of an account in the portfolio's sorted account arena.
///
/// Only valid for the portfolio that produced it; never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountIndex(pub usize);

impl fmt::Display for AccountIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
