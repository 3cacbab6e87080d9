//! Date-indexed tables flowing through the pipeline.
//!
//! Both tables are column-major: one `Vec` per symbol, aligned with `dates`.
//! They are built once and never mutated afterwards.

use chrono::NaiveDate;

use super::Symbol;

/// Adjusted closing prices, one row per trading date, one column per symbol.
///
/// Invariants (enforced by the normalizer):
/// - `dates` strictly increasing
/// - every column has `dates.len()` cells
/// - no row where every cell is missing
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<(Symbol, Vec<Option<f64>>)>,
}

impl PriceTable {
    /// Build a table from already-aligned columns.
    ///
    /// Callers are responsible for the ordering and alignment invariants;
    /// this is checked in debug builds only.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<(Symbol, Vec<Option<f64>>)>) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.iter().all(|(_, c)| c.len() == dates.len()));
        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.columns.iter().map(|(s, _)| s)
    }

    pub fn columns(&self) -> &[(Symbol, Vec<Option<f64>>)] {
        &self.columns
    }

    pub fn column(&self, symbol: &Symbol) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, c)| c.as_slice())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.columns.iter().any(|(s, _)| s == symbol)
    }
}

/// Daily simple returns plus the synthetic composite column.
///
/// Rows are the price rows that have a complete set of returns; the first
/// price row never appears (it has no predecessor).
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    columns: Vec<(Symbol, Vec<f64>)>,
    composite: Vec<f64>,
}

impl ReturnTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<(Symbol, Vec<f64>)>, composite: Vec<f64>) -> Self {
        debug_assert!(columns.iter().all(|(_, c)| c.len() == dates.len()));
        debug_assert_eq!(composite.len(), dates.len());
        Self {
            dates,
            columns,
            composite,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, symbol: &Symbol) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, c)| c.as_slice())
    }

    pub fn columns(&self) -> &[(Symbol, Vec<f64>)] {
        &self.columns
    }

    pub fn composite(&self) -> &[f64] {
        &self.composite
    }
}
