//! Monetary amounts and annual rates
//!
//! `Currency` keeps full floating precision internally and only rounds to
//! cents when displayed. `AnnualRate` derives its monthly rate by simple
//! division, matching how the engine books one twelfth of a yearly rate
//! every month.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing balances for reconciliation.
pub const CENT: f64 = 0.01;

/// A monetary amount in dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(f64);

impl Currency {
    pub const ZERO: Currency = Currency(0.0);

    #[must_use]
    pub const fn new(amount: f64) -> Self {
        Currency(amount)
    }

    #[must_use]
    pub const fn amount(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn flip_sign(self) -> Self {
        Currency(-self.0)
    }

    #[must_use]
    pub fn abs(self) -> Self {
        Currency(self.0.abs())
    }

    #[must_use]
    pub fn min(self, other: Currency) -> Self {
        Currency(self.0.min(other.0))
    }

    #[must_use]
    pub fn max(self, other: Currency) -> Self {
        Currency(self.0.max(other.0))
    }

    /// Clamp negative amounts to zero.
    #[must_use]
    pub fn positive_part(self) -> Self {
        Currency(self.0.max(0.0))
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// True when both amounts agree to within one cent.
    #[must_use]
    pub fn approx_eq(self, other: Currency) -> bool {
        (self.0 - other.0).abs() <= CENT
    }

    /// Amount rounded to whole cents.
    #[must_use]
    pub fn rounded(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // adding +0.0 folds negative zero into zero
        let cents = self.rounded() + 0.0;
        if cents < 0.0 {
            write!(f, "-${:.2}", -cents)
        } else {
            write!(f, "${cents:.2}")
        }
    }
}

impl Add for Currency {
    type Output = Currency;

    fn add(self, rhs: Currency) -> Currency {
        Currency(self.0 + rhs.0)
    }
}

impl AddAssign for Currency {
    fn add_assign(&mut self, rhs: Currency) {
        self.0 += rhs.0;
    }
}

impl Sub for Currency {
    type Output = Currency;

    fn sub(self, rhs: Currency) -> Currency {
        Currency(self.0 - rhs.0)
    }
}

impl SubAssign for Currency {
    fn sub_assign(&mut self, rhs: Currency) {
        self.0 -= rhs.0;
    }
}

impl Mul<f64> for Currency {
    type Output = Currency;

    fn mul(self, rhs: f64) -> Currency {
        Currency(self.0 * rhs)
    }
}

impl Neg for Currency {
    type Output = Currency;

    fn neg(self) -> Currency {
        self.flip_sign()
    }
}

impl Sum for Currency {
    fn sum<I: Iterator<Item = Currency>>(iter: I) -> Currency {
        iter.fold(Currency::ZERO, Add::add)
    }
}

impl From<f64> for Currency {
    fn from(amount: f64) -> Self {
        Currency(amount)
    }
}

/// A decimal annual rate (0.05 = 5% per year).
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnualRate(f64);

impl AnnualRate {
    pub const ZERO: AnnualRate = AnnualRate(0.0);

    #[must_use]
    pub const fn new(rate: f64) -> Self {
        AnnualRate(rate)
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Monthly rate: annual rate divided by twelve, no compounding conversion.
    #[must_use]
    pub fn monthly(self) -> f64 {
        self.0 / 12.0
    }

    /// Growth multiplier for one year, `1 + rate`.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        1.0 + self.0
    }
}

impl fmt::Display for AnnualRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}
