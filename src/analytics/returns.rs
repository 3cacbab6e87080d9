//! Daily returns and the weighted composite.

use tracing::debug;

use crate::domain::{CompositeSpec, CompositeWeight, PriceTable, ReturnTable, Symbol};
use crate::error::PipelineError;

/// Convert prices to simple daily returns and append the composite column.
///
/// `return[t] = price[t] / price[t-1] - 1`. The first price row has no
/// predecessor and never appears. Any row where some symbol's return cannot
/// be computed (missing price on either day, or a zero prior price) is
/// dropped entirely rather than filled.
pub fn compute_returns(
    prices: &PriceTable,
    composite: &CompositeSpec,
    weight: CompositeWeight,
) -> Result<ReturnTable, PipelineError> {
    for symbol in [&composite.first, &composite.second] {
        if !prices.contains(symbol) {
            return Err(PipelineError::MissingSymbols(vec![symbol.clone()]));
        }
    }

    let n = prices.len();
    let raw: Vec<(Symbol, Vec<Option<f64>>)> = prices
        .columns()
        .iter()
        .map(|(symbol, values)| {
            let changes = (1..n).map(|t| pct_change(values[t - 1], values[t])).collect();
            (symbol.clone(), changes)
        })
        .collect();

    let complete: Vec<usize> = (0..n.saturating_sub(1))
        .filter(|&t| raw.iter().all(|(_, c)| c[t].is_some()))
        .collect();
    let dropped = n.saturating_sub(1) - complete.len();
    if dropped > 0 {
        debug!(dropped, "dropped return rows with gaps");
    }

    let dates = complete.iter().map(|&t| prices.dates()[t + 1]).collect();
    let columns: Vec<(Symbol, Vec<f64>)> = raw
        .into_iter()
        .map(|(symbol, changes)| {
            let values = complete.iter().filter_map(|&t| changes[t]).collect();
            (symbol, values)
        })
        .collect();

    let first = column(&columns, &composite.first)?;
    let second = column(&columns, &composite.second)?;
    let blended = blend(first, second, weight);

    Ok(ReturnTable::new(dates, columns, blended))
}

/// `w * a[t] + (1 - w) * b[t]`.
pub fn blend(a: &[f64], b: &[f64], weight: CompositeWeight) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(x, y)| weight.first() * x + weight.second() * y)
        .collect()
}

fn pct_change(prev: Option<f64>, cur: Option<f64>) -> Option<f64> {
    let (prev, cur) = (prev?, cur?);
    let r = cur / prev - 1.0;
    r.is_finite().then_some(r)
}

fn column<'a>(columns: &'a [(Symbol, Vec<f64>)], symbol: &Symbol) -> Result<&'a [f64], PipelineError> {
    columns
        .iter()
        .find(|(s, _)| s == symbol)
        .map(|(_, c)| c.as_slice())
        .ok_or_else(|| PipelineError::MissingSymbols(vec![symbol.clone()]))
}
