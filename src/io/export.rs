//! Export the per-date dashboard series to CSV.
//!
//! One row per return date; each chart series is one column. Rolling series
//! are blank before their first full window.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::report::{DashboardView, TimeChart};

/// Write every chart series of `view` to `path`.
pub fn write_series_csv(path: &Path, view: &DashboardView) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let (header, rows) = series_table(view);
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for (date, cells) in rows {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.to_string());
        record.extend(cells.into_iter().map(|v| v.map(|x| format!("{x:.10}")).unwrap_or_default()));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

type Rows = BTreeMap<NaiveDate, Vec<Option<f64>>>;

/// Column names plus date-keyed rows, aligned on the performance chart's dates.
fn series_table(view: &DashboardView) -> (Vec<String>, Rows) {
    let charts = &view.charts;
    let dates: Vec<NaiveDate> = charts
        .performance
        .series
        .first()
        .map(|s| s.points.iter().map(|(d, _)| *d).collect())
        .unwrap_or_default();

    let mut header = vec!["date".to_string()];
    let mut columns: Vec<BTreeMap<NaiveDate, f64>> = Vec::new();

    let mut add_chart = |prefix: &str, chart: &TimeChart| {
        for series in &chart.series {
            header.push(format!("{prefix}_{}", series.label));
            columns.push(series.points.iter().copied().collect());
        }
    };
    add_chart("growth", &charts.performance);
    add_chart("vol", &charts.volatility);
    add_chart("drawdown", &charts.drawdown);
    add_chart("corr", &charts.correlation);

    // Scatter points are the daily returns in date order.
    let h = &view.header;
    header.push(format!("return_{}", h.composite.label));
    header.push(format!("return_{}", h.target));
    let scatter = &charts.scatter.points;
    columns.push(dates.iter().copied().zip(scatter.iter().map(|(x, _)| *x)).collect());
    columns.push(dates.iter().copied().zip(scatter.iter().map(|(_, y)| *y)).collect());

    let rows = dates
        .iter()
        .map(|d| (*d, columns.iter().map(|c| c.get(d).copied()).collect()))
        .collect();
    (header, rows)
}
