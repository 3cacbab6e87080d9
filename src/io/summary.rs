//! Summary JSON: the KPI block and regression of one render pass.
//!
//! This is the portable, machine-readable counterpart of `aix report`.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::RegressionFit;
use crate::report::DashboardView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub target: String,
    pub composite: String,
    pub composite_first: String,
    pub composite_second: String,
    pub weight_first: f64,
    pub benchmark: String,
    pub span: String,
    pub source: String,
    pub window: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub return_rows: usize,
    pub kpis: Vec<SummaryKpi>,
    pub regression: Option<SummaryRegression>,
    /// Why the regression is undefined, when it is.
    pub regression_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryKpi {
    pub label: String,
    /// `null` when the statistic is unavailable.
    pub value: Option<f64>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRegression {
    pub beta: f64,
    pub intercept: f64,
    pub r_squared: Option<f64>,
    pub n_obs: usize,
}

impl From<RegressionFit> for SummaryRegression {
    fn from(fit: RegressionFit) -> Self {
        Self {
            beta: fit.beta,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            n_obs: fit.n_obs,
        }
    }
}

impl SummaryFile {
    pub fn from_view(view: &DashboardView) -> Self {
        let h = &view.header;
        Self {
            tool: "aix".to_string(),
            target: h.target.to_string(),
            composite: h.composite.label.clone(),
            composite_first: h.composite.first.to_string(),
            composite_second: h.composite.second.to_string(),
            weight_first: h.weight.first(),
            benchmark: h.benchmark.symbol().to_string(),
            span: h.span.display_name().to_string(),
            source: h.source.clone(),
            window: h.window,
            first_date: h.first_date,
            last_date: h.last_date,
            return_rows: h.return_rows,
            kpis: view
                .kpis
                .iter()
                .map(|k| SummaryKpi {
                    label: k.label.clone(),
                    value: k.value.as_f64(),
                    display: k.value.to_string(),
                })
                .collect(),
            regression: view.regression.ok().map(SummaryRegression::from),
            regression_note: view.regression.err().map(|e| e.to_string()),
        }
    }
}

/// Write the summary JSON file.
pub fn write_summary_json(path: &Path, view: &DashboardView) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &SummaryFile::from_view(view))
        .map_err(|e| AppError::new(4, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))
}
