//! Raw response -> `PriceTable`.
//!
//! Providers return one of two layouts (grouped by `(field, symbol)` or flat
//! per-field when a single symbol was requested) and carry the adjusted close
//! under either `Close` or `Adj Close`. This module resolves both into one
//! adjusted-price column per symbol, then enforces the viability rules:
//!
//! - rows where every symbol is missing are dropped
//! - dates are sorted ascending; a repeated date keeps its first row
//! - fewer than `min_rows` rows -> `NoData`
//! - any requested symbol without a column, or whose column holds no price,
//!   -> `MissingSymbols`

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{PriceTable, Symbol};
use crate::error::PipelineError;

use super::{FIELD_ADJ_CLOSE, FIELD_CLOSE, RawColumns, RawPriceFrame};

/// Normalize `frame` into a price table restricted to `requested` symbols.
pub fn normalize_prices(
    frame: &RawPriceFrame,
    requested: &[Symbol],
    min_rows: usize,
) -> Result<PriceTable, PipelineError> {
    if frame.is_empty() {
        return Err(PipelineError::NoData("empty response".to_string()));
    }

    let field = select_price_field(frame)
        .ok_or_else(|| PipelineError::NoData("response has no Close or Adj Close field".to_string()))?;

    let columns = match &frame.columns {
        RawColumns::Grouped(cols) => grouped_columns(cols, field),
        RawColumns::Flat(cols) => flat_columns(cols, field, requested),
    };

    for (symbol, column) in &columns {
        if column.len() != frame.index.len() {
            return Err(PipelineError::NoData(format!(
                "column {symbol} has {} values for {} dates",
                column.len(),
                frame.index.len()
            )));
        }
    }

    let (dates, columns) = sorted_non_empty_rows(&frame.index, columns);
    if dates.len() < min_rows {
        return Err(PipelineError::NoData(format!(
            "{} usable rows, need at least {min_rows}",
            dates.len()
        )));
    }

    let missing: Vec<Symbol> = requested
        .iter()
        .filter(|s| {
            !columns
                .iter()
                .any(|(c, values)| c == *s && values.iter().any(Option::is_some))
        })
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingSymbols(missing));
    }

    // Project onto the requested symbols, in request order.
    let projected: Vec<(Symbol, Vec<Option<f64>>)> = requested
        .iter()
        .filter_map(|s| columns.iter().find(|(c, _)| c == s).cloned())
        .collect();
    let (dates, projected) = sorted_non_empty_rows(&dates, projected);
    if dates.len() < min_rows {
        return Err(PipelineError::NoData(format!(
            "{} usable rows for the requested symbols, need at least {min_rows}",
            dates.len()
        )));
    }

    debug!(rows = dates.len(), field, "normalized price table");
    Ok(PriceTable::new(dates, projected))
}

/// Pick the field holding adjusted closes.
///
/// `Close` wins when the provider already adjusted it; otherwise a separate
/// `Adj Close` is preferred, and a raw `Close` is the last resort.
fn select_price_field(frame: &RawPriceFrame) -> Option<&'static str> {
    let fields = frame.fields();
    let has_close = fields.contains(FIELD_CLOSE);
    let has_adj = fields.contains(FIELD_ADJ_CLOSE);

    if frame.adjusted_at_source && has_close {
        Some(FIELD_CLOSE)
    } else if has_adj {
        Some(FIELD_ADJ_CLOSE)
    } else if has_close {
        warn!("no adjusted close available; using unadjusted Close");
        Some(FIELD_CLOSE)
    } else {
        None
    }
}

fn grouped_columns(
    cols: &BTreeMap<(String, Symbol), Vec<Option<f64>>>,
    field: &str,
) -> Vec<(Symbol, Vec<Option<f64>>)> {
    cols.iter()
        .filter(|((f, _), _)| f == field)
        .map(|((_, symbol), values)| (symbol.clone(), clean(values)))
        .collect()
}

/// Flat layout: the symbol is implied, which is only unambiguous when exactly
/// one symbol was requested. Otherwise the column keeps the field's name and
/// every requested symbol ends up missing.
fn flat_columns(
    cols: &BTreeMap<String, Vec<Option<f64>>>,
    field: &str,
    requested: &[Symbol],
) -> Vec<(Symbol, Vec<Option<f64>>)> {
    let Some(values) = cols.get(field) else {
        return Vec::new();
    };
    match requested {
        [only] => vec![(only.clone(), clean(values))],
        _ => {
            warn!(
                requested = requested.len(),
                "flat response layout for a multi-symbol request; symbols cannot be attributed"
            );
            vec![(Symbol::new(field), clean(values))]
        }
    }
}

/// Non-finite or negative prices count as missing.
fn clean(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| v.filter(|p| p.is_finite() && *p >= 0.0))
        .collect()
}

fn sorted_non_empty_rows(
    index: &[NaiveDate],
    columns: Vec<(Symbol, Vec<Option<f64>>)>,
) -> (Vec<NaiveDate>, Vec<(Symbol, Vec<Option<f64>>)>) {
    let mut first_row: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut duplicates = 0usize;
    for (row, date) in index.iter().enumerate() {
        if first_row.contains_key(date) {
            duplicates += 1;
        } else {
            first_row.insert(*date, row);
        }
    }
    if duplicates > 0 {
        debug!(duplicates, "dropped repeated dates");
    }

    let keep: Vec<(NaiveDate, usize)> = first_row
        .into_iter()
        .filter(|(_, row)| columns.iter().any(|(_, c)| c[*row].is_some()))
        .collect();

    let dropped = index.len() - duplicates - keep.len();
    if dropped > 0 {
        debug!(dropped, "dropped rows with no prices");
    }

    let dates = keep.iter().map(|(d, _)| *d).collect();
    let columns = columns
        .into_iter()
        .map(|(symbol, values)| {
            let kept = keep.iter().map(|(_, row)| values[*row]).collect();
            (symbol, kept)
        })
        .collect();

    (dates, columns)
}
