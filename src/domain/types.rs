//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - parsed from CLI flags and config files
//! - passed through the fetch -> statistics pipeline by value
//! - exported to JSON/CSV

use std::fmt;

use chrono::{Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Identifier of a tradable instrument (`BLK`, `NVDA`, `^IXIC`, ...).
///
/// No structure is assumed beyond equality and ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::str::FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = Symbol::new(s);
        if symbol.is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        Ok(symbol)
    }
}

/// Look-back window of the price history ("Last 6M" .. "Last 5Y").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Span {
    #[serde(rename = "6m")]
    #[value(name = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    #[value(name = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    #[value(name = "2y")]
    TwoYears,
    #[serde(rename = "3y")]
    #[value(name = "3y")]
    ThreeYears,
    #[serde(rename = "4y")]
    #[value(name = "4y")]
    FourYears,
    #[serde(rename = "5y")]
    #[value(name = "5y")]
    FiveYears,
}

impl Span {
    pub const ALL: [Span; 6] = [
        Span::SixMonths,
        Span::OneYear,
        Span::TwoYears,
        Span::ThreeYears,
        Span::FourYears,
        Span::FiveYears,
    ];

    pub fn months(self) -> u32 {
        match self {
            Span::SixMonths => 6,
            Span::OneYear => 12,
            Span::TwoYears => 24,
            Span::ThreeYears => 36,
            Span::FourYears => 48,
            Span::FiveYears => 60,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Span::SixMonths => "Last 6M",
            Span::OneYear => "Last 1Y",
            Span::TwoYears => "Last 2Y",
            Span::ThreeYears => "Last 3Y",
            Span::FourYears => "Last 4Y",
            Span::FiveYears => "Last 5Y",
        }
    }

    /// First calendar date covered by this span when it ends at `end`.
    pub fn start_date(self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Market index the target and composite are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    /// Nasdaq Composite (`^IXIC`).
    Nasdaq,
    /// S&P 500 (`^GSPC`).
    Sp500,
}

impl Benchmark {
    pub const ALL: [Benchmark; 2] = [Benchmark::Nasdaq, Benchmark::Sp500];

    pub fn symbol(self) -> Symbol {
        match self {
            Benchmark::Nasdaq => Symbol::new("^IXIC"),
            Benchmark::Sp500 => Symbol::new("^GSPC"),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Benchmark::Nasdaq => "Nasdaq Composite (^IXIC)",
            Benchmark::Sp500 => "S&P 500 (^GSPC)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Benchmark::Nasdaq => Benchmark::Sp500,
            Benchmark::Sp500 => Benchmark::Nasdaq,
        }
    }
}

/// Granularity of the composite weight control.
pub const WEIGHT_STEP: f64 = 0.05;

/// Share of the composite assigned to its first constituent.
///
/// The second constituent's share is always derived as `1 - w`, so the two
/// weights can never be chosen independently.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CompositeWeight(f64);

impl CompositeWeight {
    pub const HALF: CompositeWeight = CompositeWeight(0.5);

    pub fn new(first: f64) -> Result<Self, String> {
        if !first.is_finite() || !(0.0..=1.0).contains(&first) {
            return Err(format!("composite weight must be within [0, 1], got {first}"));
        }
        Ok(Self(first))
    }

    /// Build a weight snapped to the nearest [`WEIGHT_STEP`].
    pub fn snapped(first: f64) -> Result<Self, String> {
        let weight = Self::new(first)?;
        let steps = (weight.0 / WEIGHT_STEP).round();
        Ok(Self((steps * WEIGHT_STEP).clamp(0.0, 1.0)))
    }

    pub fn first(self) -> f64 {
        self.0
    }

    pub fn second(self) -> f64 {
        1.0 - self.0
    }

    /// Move the weight by `delta` steps, saturating at the ends of [0, 1].
    pub fn step(self, delta: i32) -> Self {
        let steps = (self.0 / WEIGHT_STEP).round() + f64::from(delta);
        let max_steps = (1.0 / WEIGHT_STEP).round();
        Self(steps.clamp(0.0, max_steps) * WEIGHT_STEP)
    }
}

impl Default for CompositeWeight {
    fn default() -> Self {
        Self::HALF
    }
}

impl TryFrom<f64> for CompositeWeight {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompositeWeight> for f64 {
    fn from(value: CompositeWeight) -> Self {
        value.0
    }
}

impl std::str::FromStr for CompositeWeight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: f64 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid weight '{s}': {e}"))?;
        Self::snapped(raw)
    }
}

/// The blend of two constituents' daily returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub first: Symbol,
    pub second: Symbol,
    /// Display label of the synthetic series ("AI Composite").
    pub label: String,
}

/// User-facing dashboard controls for one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub span: Span,
    pub benchmark: Benchmark,
    pub weight: CompositeWeight,
    /// Invalidate the cached prices for the current key before fetching.
    pub refresh: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            span: Span::OneYear,
            benchmark: Benchmark::Nasdaq,
            weight: CompositeWeight::HALF,
            refresh: false,
        }
    }
}

/// Statistic parameters shared by the rolling computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Trailing window length `W` (rows).
    pub window: usize,
    /// Annualization factor `F` (trading days per year).
    pub annualization: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window: 30,
            annualization: 252.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_complement_sums_to_one() {
        for i in 0..=20 {
            let w = CompositeWeight::new(i as f64 * 0.05).unwrap();
            assert!((w.first() + w.second() - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn weight_rejects_out_of_range() {
        assert!(CompositeWeight::new(-0.01).is_err());
        assert!(CompositeWeight::new(1.01).is_err());
        assert!(CompositeWeight::new(f64::NAN).is_err());
        assert!(CompositeWeight::new(0.0).is_ok());
        assert!(CompositeWeight::new(1.0).is_ok());
    }

    #[test]
    fn weight_snaps_and_steps_on_grid() {
        let w: CompositeWeight = "0.52".parse().unwrap();
        assert!((w.first() - 0.5).abs() < 1e-12);

        let up = w.step(1);
        assert!((up.first() - 0.55).abs() < 1e-12);

        let top = CompositeWeight::new(1.0).unwrap().step(3);
        assert!((top.first() - 1.0).abs() < 1e-12);

        let bottom = CompositeWeight::new(0.0).unwrap().step(-1);
        assert!(bottom.first().abs() < 1e-12);
    }

    #[test]
    fn span_start_date_subtracts_months() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(
            Span::SixMonths.start_date(end),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
        );
        assert_eq!(
            Span::TwoYears.start_date(end),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap()
        );
    }

    #[test]
    fn span_cycles_through_all_values() {
        let mut span = Span::FiveYears;
        span = span.next();
        assert_eq!(span, Span::SixMonths);
        assert_eq!(span.prev(), Span::FiveYears);
    }
}
