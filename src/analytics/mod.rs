//! Return, risk and relationship statistics.
//!
//! Pipeline stages (each produces new data, nothing is mutated in place):
//!
//! 1. `returns`: price table -> daily returns + composite column
//! 2. `analyze`: returns -> growth curves, rolling correlation/volatility,
//!    full-history regression, drawdown

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{ReturnTable, StatsConfig, Symbol};
use crate::error::{PipelineError, StatError};
use crate::math::{RegressionFit, regress};

pub mod performance;
pub mod returns;
pub mod rolling;

pub use performance::{cumulative_growth, drawdown, max_drawdown, total_return};
pub use returns::compute_returns;
pub use rolling::{latest_valid, rolling_correlation, rolling_volatility};

/// Growth of one unit invested at the start of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthCurves {
    pub target: Vec<f64>,
    pub composite: Vec<f64>,
    pub benchmark: Vec<f64>,
}

/// Everything the presentation layer needs from one statistics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub dates: Vec<NaiveDate>,
    pub target_returns: Vec<f64>,
    pub composite_returns: Vec<f64>,
    pub benchmark_returns: Vec<f64>,
    pub growth: GrowthCurves,
    pub rolling_correlation: Vec<Option<f64>>,
    pub rolling_vol_target: Vec<Option<f64>>,
    pub rolling_vol_composite: Vec<Option<f64>>,
    pub regression: Result<RegressionFit, StatError>,
    pub target_drawdown: Vec<f64>,
    pub config: StatsConfig,
}

impl RiskReport {
    pub fn target_total_return(&self) -> f64 {
        total_return(&self.growth.target)
    }

    pub fn composite_total_return(&self) -> f64 {
        total_return(&self.growth.composite)
    }

    pub fn benchmark_total_return(&self) -> f64 {
        total_return(&self.growth.benchmark)
    }

    pub fn latest_correlation(&self) -> Result<f64, StatError> {
        latest_valid(&self.rolling_correlation, self.config.window)
    }

    pub fn latest_target_volatility(&self) -> Result<f64, StatError> {
        latest_valid(&self.rolling_vol_target, self.config.window)
    }

    pub fn latest_composite_volatility(&self) -> Result<f64, StatError> {
        latest_valid(&self.rolling_vol_composite, self.config.window)
    }

    pub fn max_target_drawdown(&self) -> f64 {
        max_drawdown(&self.target_drawdown)
    }
}

/// Compute the statistics bundle for `target` against the composite column,
/// with `benchmark` as the reference growth curve.
pub fn analyze(
    returns: &ReturnTable,
    target: &Symbol,
    benchmark: &Symbol,
    config: StatsConfig,
) -> Result<RiskReport, PipelineError> {
    if returns.is_empty() {
        return Err(PipelineError::NoData("no overlapping returns".to_string()));
    }

    let (Some(target_returns), Some(benchmark_returns)) = (returns.column(target), returns.column(benchmark))
    else {
        let missing = [target, benchmark]
            .into_iter()
            .filter(|s| returns.column(s).is_none())
            .cloned()
            .collect();
        return Err(PipelineError::MissingSymbols(missing));
    };
    let composite_returns = returns.composite();

    let growth = GrowthCurves {
        target: cumulative_growth(target_returns),
        composite: cumulative_growth(composite_returns),
        benchmark: cumulative_growth(benchmark_returns),
    };

    let window = config.window;
    let rolling_correlation = rolling_correlation(target_returns, composite_returns, window);
    let rolling_vol_target = rolling_volatility(target_returns, window, config.annualization);
    let rolling_vol_composite = rolling_volatility(composite_returns, window, config.annualization);

    let regression = regress(composite_returns, target_returns);
    match &regression {
        Ok(fit) => debug!(beta = fit.beta, r_squared = ?fit.r_squared, n = fit.n_obs, "regression fitted"),
        Err(e) => warn!(error = %e, "regression unavailable"),
    }

    let target_drawdown = drawdown(&growth.target);

    Ok(RiskReport {
        dates: returns.dates().to_vec(),
        target_returns: target_returns.to_vec(),
        composite_returns: composite_returns.to_vec(),
        benchmark_returns: benchmark_returns.to_vec(),
        growth,
        rolling_correlation,
        rolling_vol_target,
        rolling_vol_composite,
        regression,
        target_drawdown,
        config,
    })
}
