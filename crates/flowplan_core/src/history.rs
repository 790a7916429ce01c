//! Historical annual series for backtest runs
//!
//! A backtest maps each simulated year onto a historical year
//! (`from_year + (year - first_simulated_year)`) and overrides account rates
//! by return class for as long as data exists.

use serde::{Deserialize, Serialize};

use crate::model::ReturnClass;

/// US Large Cap Stocks (S&P 500 Total Return)
/// Source: Robert Shiller, Yale University
/// Annual returns 1927-2023 (97 years)
pub const SP_500_ANNUAL_RETURNS: &[f64] = &[
    0.1071, 0.3490, 0.4533, -0.0803, -0.1985, -0.3873, -0.0936, 0.5318, -0.0791, 0.5231, 0.3292,
    -0.2964, 0.1507, 0.0431, -0.0719, -0.0786, 0.1817, 0.2250, 0.1815, 0.3760, -0.1054, 0.0309,
    0.1032, 0.1677, 0.3240, 0.1990, 0.1397, 0.0222, 0.4375, 0.2781, 0.0684, -0.0571, 0.3839,
    0.0780, 0.0587, 0.1897, -0.0266, 0.2045, 0.1562, 0.1168, -0.0634, 0.1558, 0.1052, -0.0765,
    0.0667, 0.1332, 0.1763, -0.1457, -0.2023, 0.3722, 0.1162, -0.0793, 0.1570, 0.1623, 0.2494,
    -0.0613, 0.2736, 0.1987, 0.0727, 0.2477, 0.3002, -0.0181, 0.1715, 0.2260, -0.0102, 0.3080,
    0.0737, 0.1147, 0.0084, 0.3421, 0.2645, 0.2720, 0.3087, 0.1532, -0.0498, -0.1304, -0.1972,
    0.2807, 0.0606, 0.1004, 0.1316, -0.0085, -0.3455, 0.3176, 0.1609, 0.0348, 0.1586, 0.2504,
    0.1332, -0.0327, 0.2052, 0.2449, -0.0461, 0.2756, 0.1710, 0.2212, -0.1180,
];
pub const SP_500_FIRST_YEAR: u16 = 1927;

/// US Long-Term Government Bonds (estimated from yields)
/// Source: Robert Shiller, Yale University (estimated)
/// Annual returns 1927-2023 (97 years)
pub const US_LONG_BOND_ANNUAL_RETURNS: &[f64] = &[
    0.0503, 0.0239, 0.0342, 0.0462, 0.0185, 0.0338, 0.0581, 0.0526, 0.0491, 0.0322, 0.0297,
    0.0388, 0.0388, 0.0389, 0.0135, -0.0006, 0.0238, 0.0283, 0.0357, 0.0285, 0.0126, 0.0199,
    0.0291, 0.0135, 0.0095, 0.0159, 0.0202, 0.0634, -0.0092, -0.0011, -0.0054, 0.0630, -0.0482,
    0.0607, 0.0599, 0.0338, 0.0349, 0.0253, 0.0342, -0.0084, 0.0372, 0.0049, -0.0255, 0.0125,
    0.1686, 0.0575, 0.0115, 0.0112, 0.0412, 0.1099, 0.0915, -0.0051, 0.0015, -0.0670, -0.0815,
    0.2118, 0.2817, 0.0044, 0.2696, 0.3415, 0.0207, 0.0469, 0.1163, 0.0809, 0.1408, 0.1464,
    0.1610, -0.0378, 0.1108, 0.0771, 0.0712, 0.1506, 0.0228, 0.0250, 0.1412, 0.0827, 0.0938,
    0.0194, 0.0415, 0.0028, 0.0609, 0.1233, 0.0695, 0.0360, 0.0664, 0.1065, -0.0258, 0.0083,
    0.0578, 0.0449, -0.0206, -0.0231, 0.0933, 0.1181, -0.0349, -0.1063, -0.0355,
];
pub const US_LONG_BOND_FIRST_YEAR: u16 = 1927;

/// US CPI Inflation (All Urban Consumers)
/// Source: FRED (CPIAUCSL)
/// Annual rates 1948-2025 (78 years)
pub const US_CPI_ANNUAL_RATES: &[f64] = &[
    0.0273, -0.0183, 0.0580, 0.0596, 0.0091, 0.0060, -0.0037, 0.0037, 0.0283, 0.0304, 0.0176,
    0.0152, 0.0136, 0.0067, 0.0123, 0.0165, 0.0120, 0.0192, 0.0336, 0.0328, 0.0471, 0.0590,
    0.0557, 0.0327, 0.0341, 0.0894, 0.1210, 0.0713, 0.0504, 0.0668, 0.0899, 0.1325, 0.1235,
    0.0891, 0.0383, 0.0379, 0.0404, 0.0379, 0.0119, 0.0433, 0.0441, 0.0464, 0.0625, 0.0298,
    0.0297, 0.0281, 0.0260, 0.0253, 0.0338, 0.0170, 0.0161, 0.0268, 0.0344, 0.0160, 0.0248,
    0.0204, 0.0334, 0.0334, 0.0252, 0.0411, -0.0002, 0.0281, 0.0144, 0.0306, 0.0176, 0.0151,
    0.0065, 0.0064, 0.0205, 0.0213, 0.0200, 0.0232, 0.0132, 0.0716, 0.0641, 0.0332, 0.0287,
    0.0265,
];
pub const US_CPI_FIRST_YEAR: u16 = 1948;

/// One value per calendar year starting at `first_year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSeries {
    pub first_year: u16,
    pub values: Vec<f64>,
}

impl AnnualSeries {
    #[must_use]
    pub fn new(first_year: u16, values: &[f64]) -> Self {
        AnnualSeries {
            first_year,
            values: values.to_vec(),
        }
    }

    #[must_use]
    pub fn get(&self, year: u16) -> Option<f64> {
        let offset = year.checked_sub(self.first_year)?;
        self.values.get(usize::from(offset)).copied()
    }

    #[must_use]
    pub fn last_year(&self) -> Option<u16> {
        let len = u16::try_from(self.values.len()).ok()?;
        len.checked_sub(1).map(|n| self.first_year + n)
    }
}

/// Annual rates per return class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReturnTable {
    pub equity: AnnualSeries,
    pub bond: AnnualSeries,
    pub inflation: AnnualSeries,
}

impl Default for HistoricalReturnTable {
    fn default() -> Self {
        Self::us_historical()
    }
}

impl HistoricalReturnTable {
    #[must_use]
    pub fn us_historical() -> Self {
        HistoricalReturnTable {
            equity: AnnualSeries::new(SP_500_FIRST_YEAR, SP_500_ANNUAL_RETURNS),
            bond: AnnualSeries::new(US_LONG_BOND_FIRST_YEAR, US_LONG_BOND_ANNUAL_RETURNS),
            inflation: AnnualSeries::new(US_CPI_FIRST_YEAR, US_CPI_ANNUAL_RATES),
        }
    }

    /// Rate for a return class in a historical year. Wage-like accounts
    /// follow CPI; fixed-rate instruments never change.
    #[must_use]
    pub fn rate(&self, class: ReturnClass, year: u16) -> Option<f64> {
        match class {
            ReturnClass::Equity => self.equity.get(year),
            ReturnClass::Bond => self.bond.get(year),
            ReturnClass::Inflation | ReturnClass::Wage => self.inflation.get(year),
            ReturnClass::Fixed => None,
        }
    }

    #[must_use]
    pub fn inflation(&self, year: u16) -> Option<f64> {
        self.inflation.get(year)
    }
}

/// Backtest mapping from simulated years to historical years.
#[derive(Debug, Clone, PartialEq)]
pub struct Backtest {
    pub table: HistoricalReturnTable,
    pub from_year: u16,
    pub first_simulated_year: u16,
}

impl Backtest {
    #[must_use]
    pub fn historical_year(&self, simulated_year: u16) -> Option<u16> {
        let offset = simulated_year.checked_sub(self.first_simulated_year)?;
        self.from_year.checked_add(offset)
    }

    /// Override rate for a class in a simulated year, if the mapped year has data.
    #[must_use]
    pub fn rate(&self, class: ReturnClass, simulated_year: u16) -> Option<f64> {
        self.historical_year(simulated_year)
            .and_then(|year| self.table.rate(class, year))
    }

    #[must_use]
    pub fn inflation(&self, simulated_year: u16) -> Option<f64> {
        self.historical_year(simulated_year)
            .and_then(|year| self.table.inflation(year))
    }
}
