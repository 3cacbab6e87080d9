//! Price acquisition: the raw response shape, the fetch collaborators, the
//! cache in front of them, and the normalizer that turns a raw response into
//! a clean [`PriceTable`](crate::domain::PriceTable).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{Span, Symbol};
use crate::error::FetchError;

pub mod cache;
pub mod normalize;
pub mod sample;
pub mod yahoo;

pub use cache::{CacheKey, MemoryCache, PriceCache};
pub use normalize::normalize_prices;
pub use sample::SyntheticSource;
pub use yahoo::YahooClient;

/// Field carrying the close; adjusted when `adjusted_at_source` is set.
pub const FIELD_CLOSE: &str = "Close";
/// Field carrying a separately adjusted close.
pub const FIELD_ADJ_CLOSE: &str = "Adj Close";

/// Column layout of a raw provider response.
#[derive(Debug, Clone, PartialEq)]
pub enum RawColumns {
    /// Multi-symbol layout: one column per `(field, symbol)` pair.
    Grouped(BTreeMap<(String, Symbol), Vec<Option<f64>>>),
    /// Single-symbol layout: one column per field, symbol implied.
    Flat(BTreeMap<String, Vec<Option<f64>>>),
}

/// A provider response before normalization.
///
/// Rows follow `index`; the index is not guaranteed sorted or unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceFrame {
    pub index: Vec<NaiveDate>,
    pub columns: RawColumns,
    /// Whether `Close` already includes split/dividend adjustments.
    pub adjusted_at_source: bool,
}

impl RawPriceFrame {
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: RawColumns::Grouped(BTreeMap::new()),
            adjusted_at_source: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
            || match &self.columns {
                RawColumns::Grouped(c) => c.is_empty(),
                RawColumns::Flat(c) => c.is_empty(),
            }
    }

    /// Distinct field names present in the response.
    pub fn fields(&self) -> BTreeSet<&str> {
        match &self.columns {
            RawColumns::Grouped(c) => c.keys().map(|(f, _)| f.as_str()).collect(),
            RawColumns::Flat(c) => c.keys().map(String::as_str).collect(),
        }
    }

    /// Build a grouped frame from per-symbol `(date, value)` observations of a
    /// set of fields, aligned on the union of all dates.
    pub fn from_observations(
        observations: Vec<((String, Symbol), Vec<(NaiveDate, f64)>)>,
        adjusted_at_source: bool,
    ) -> Self {
        let index: Vec<NaiveDate> = observations
            .iter()
            .flat_map(|(_, obs)| obs.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: BTreeMap<NaiveDate, usize> =
            index.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut columns = BTreeMap::new();
        for (key, obs) in observations {
            let mut column = vec![None; index.len()];
            for (date, value) in obs {
                // First observation of a date wins.
                if let Some(&i) = position.get(&date) {
                    column[i].get_or_insert(value);
                }
            }
            columns.insert(key, column);
        }

        Self {
            index,
            columns: RawColumns::Grouped(columns),
            adjusted_at_source,
        }
    }
}

impl RawPriceFrame {
    /// Keep only rows dated on or after `start`.
    pub fn retain_since(&mut self, start: NaiveDate) {
        let keep: Vec<bool> = self.index.iter().map(|d| *d >= start).collect();
        let filter = |values: &mut Vec<Option<f64>>| {
            let mut flags = keep.iter();
            values.retain(|_| flags.next().copied().unwrap_or(false));
        };
        match &mut self.columns {
            RawColumns::Grouped(c) => c.values_mut().for_each(filter),
            RawColumns::Flat(c) => c.values_mut().for_each(filter),
        }
        self.index.retain(|d| *d >= start);
    }

    /// Latest date in the index, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.iter().max().copied()
    }
}

/// A price-fetch collaborator.
pub trait PriceSource {
    /// Human-readable provider name (shown in footers and logs).
    fn name(&self) -> &str;

    /// Fetch daily prices for `symbols` over `span`, ending at the latest
    /// available date.
    fn fetch(&self, symbols: &[Symbol], span: Span) -> Result<RawPriceFrame, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn from_observations_aligns_on_union_of_dates() {
        let frame = RawPriceFrame::from_observations(
            vec![
                (
                    (FIELD_CLOSE.to_string(), Symbol::new("A")),
                    vec![(d(3), 3.0), (d(1), 1.0)],
                ),
                (
                    (FIELD_CLOSE.to_string(), Symbol::new("B")),
                    vec![(d(2), 20.0)],
                ),
            ],
            true,
        );

        assert_eq!(frame.index, vec![d(1), d(2), d(3)]);
        let RawColumns::Grouped(cols) = &frame.columns else {
            panic!("expected grouped layout");
        };
        assert_eq!(
            cols[&(FIELD_CLOSE.to_string(), Symbol::new("A"))],
            vec![Some(1.0), None, Some(3.0)]
        );
        assert_eq!(
            cols[&(FIELD_CLOSE.to_string(), Symbol::new("B"))],
            vec![None, Some(20.0), None]
        );
        assert_eq!(frame.fields().into_iter().collect::<Vec<_>>(), vec![FIELD_CLOSE]);
    }

    #[test]
    fn retain_since_drops_older_rows_in_every_column() {
        let mut frame = RawPriceFrame::from_observations(
            vec![(
                (FIELD_CLOSE.to_string(), Symbol::new("A")),
                vec![(d(1), 1.0), (d(2), 2.0), (d(3), 3.0), (d(3), 9.0)],
            )],
            true,
        );
        frame.retain_since(d(2));

        assert_eq!(frame.index, vec![d(2), d(3)]);
        assert_eq!(frame.last_date(), Some(d(3)));
        let RawColumns::Grouped(cols) = &frame.columns else {
            panic!("expected grouped layout");
        };
        assert_eq!(cols[&(FIELD_CLOSE.to_string(), Symbol::new("A"))], vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn empty_frame_reports_empty() {
        assert!(RawPriceFrame::empty().is_empty());
    }
}
