//! Presentation adapter: maps the statistics bundle onto labeled KPIs and
//! chart descriptions that any renderer (terminal text, TUI, export) consumes.
//!
//! Nothing here computes statistics; it only names, pairs, and filters them.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::RiskReport;
use crate::domain::{Benchmark, CompositeSpec, CompositeWeight, Span, Symbol};
use crate::error::StatError;
use crate::math::RegressionFit;

pub mod format;

pub use format::{format_dashboard, format_kpis};

/// Placeholder shown for any statistic that is undefined.
pub const UNAVAILABLE: &str = "—";

/// A single KPI value with its display policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum KpiValue {
    /// Fraction rendered as a percentage (`0.1234` -> `12.34%`).
    Percent(f64),
    /// Plain number rendered with two decimals.
    Ratio(f64),
    Unavailable,
}

impl KpiValue {
    pub fn percent(value: Result<f64, StatError>) -> Self {
        match value {
            Ok(v) if v.is_finite() => KpiValue::Percent(v),
            _ => KpiValue::Unavailable,
        }
    }

    pub fn ratio(value: Result<f64, StatError>) -> Self {
        match value {
            Ok(v) if v.is_finite() => KpiValue::Ratio(v),
            _ => KpiValue::Unavailable,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self {
            KpiValue::Percent(v) | KpiValue::Ratio(v) => Some(v),
            KpiValue::Unavailable => None,
        }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Percent(v) => write!(f, "{:.2}%", v * 100.0),
            KpiValue::Ratio(v) => write!(f, "{v:.2}"),
            KpiValue::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: KpiValue,
}

/// One labeled line of a date-indexed chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeChart {
    pub title: String,
    pub y_label: String,
    pub series: Vec<TimeSeries>,
}

impl TimeChart {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// Paired daily returns with the fitted regression line (when defined).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    pub fit: Option<RegressionFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub performance: TimeChart,
    pub volatility: TimeChart,
    pub drawdown: TimeChart,
    pub correlation: TimeChart,
    pub scatter: ScatterChart,
}

/// What was rendered, and from what.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewHeader {
    pub target: Symbol,
    pub composite: CompositeSpec,
    pub weight: CompositeWeight,
    pub benchmark: Benchmark,
    pub span: Span,
    pub source: String,
    pub window: usize,
    pub price_rows: usize,
    pub return_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Everything one render pass produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub header: ViewHeader,
    pub kpis: Vec<Kpi>,
    pub charts: Charts,
    #[serde(skip)]
    pub regression: Result<RegressionFit, StatError>,
    pub footer: String,
}

impl DashboardView {
    /// `"NVDA: 50%  |  MSFT: 50%"`.
    pub fn weight_caption(&self) -> String {
        weight_caption(&self.header.composite, self.header.weight)
    }
}

/// Render-pass context the statistics bundle does not carry.
#[derive(Debug, Clone)]
pub struct ViewContext<'a> {
    pub target: &'a Symbol,
    pub composite: &'a CompositeSpec,
    pub weight: CompositeWeight,
    pub benchmark: Benchmark,
    pub span: Span,
    pub source: &'a str,
    pub price_rows: usize,
}

/// Map a statistics bundle to KPIs and chart descriptions.
pub fn build_view(report: &RiskReport, ctx: &ViewContext<'_>) -> DashboardView {
    let t = ctx.target.as_str();
    let c = ctx.composite.label.as_str();
    let w = report.config.window;

    let kpis = vec![
        Kpi {
            label: format!("{t} Return (Selected Period)"),
            value: KpiValue::Percent(report.target_total_return()),
        },
        Kpi {
            label: format!("{c} Return (Selected Period)"),
            value: KpiValue::Percent(report.composite_total_return()),
        },
        Kpi {
            label: format!("{w}D Correlation ({t} vs {c})"),
            value: KpiValue::ratio(report.latest_correlation()),
        },
        Kpi {
            label: format!("{t} {w}D Volatility (Ann.)"),
            value: KpiValue::percent(report.latest_target_volatility()),
        },
        Kpi {
            label: format!("Beta vs {c} (OLS)"),
            value: KpiValue::ratio(report.regression.map(|fit| fit.beta)),
        },
    ];

    let dates = &report.dates;
    let performance = TimeChart {
        title: "Performance Comparison (Cumulative Return)".to_string(),
        y_label: "Growth of $1".to_string(),
        series: vec![
            dense(t, dates, &report.growth.target),
            dense(c, dates, &report.growth.composite),
            dense("Benchmark", dates, &report.growth.benchmark),
        ],
    };

    // Only rows where both volatilities exist, so the two lines share an x range.
    let both: Vec<usize> = (0..dates.len())
        .filter(|&i| report.rolling_vol_target[i].is_some() && report.rolling_vol_composite[i].is_some())
        .collect();
    let volatility = TimeChart {
        title: format!("Risk Analysis (Rolling Volatility, {w}D)"),
        y_label: "Annualized Volatility".to_string(),
        series: vec![
            sparse_rows(t, dates, &report.rolling_vol_target, &both),
            sparse_rows(c, dates, &report.rolling_vol_composite, &both),
        ],
    };

    let drawdown = TimeChart {
        title: format!("Drawdown ({t})"),
        y_label: "Drawdown".to_string(),
        series: vec![dense(t, dates, &report.target_drawdown)],
    };

    let defined: Vec<usize> = (0..dates.len())
        .filter(|&i| report.rolling_correlation[i].is_some())
        .collect();
    let correlation = TimeChart {
        title: format!("Relationship Over Time (Rolling Correlation, {w}D)"),
        y_label: "Correlation".to_string(),
        series: vec![sparse_rows(
            &format!("{t} vs {c}"),
            dates,
            &report.rolling_correlation,
            &defined,
        )],
    };

    let fit = report.regression.ok();
    let r2 = KpiValue::ratio(
        report
            .regression
            .and_then(|f| f.r_squared.ok_or(StatError::DegenerateRegression)),
    );
    let beta = KpiValue::ratio(report.regression.map(|f| f.beta));
    let scatter = ScatterChart {
        title: format!("Sensitivity (Beta) & Fit | R²={r2} | Beta={beta}"),
        x_label: format!("{c} Daily Return"),
        y_label: format!("{t} Daily Return"),
        points: report
            .composite_returns
            .iter()
            .copied()
            .zip(report.target_returns.iter().copied())
            .collect(),
        fit,
    };

    DashboardView {
        header: ViewHeader {
            target: ctx.target.clone(),
            composite: ctx.composite.clone(),
            weight: ctx.weight,
            benchmark: ctx.benchmark,
            span: ctx.span,
            source: ctx.source.to_string(),
            window: w,
            price_rows: ctx.price_rows,
            return_rows: dates.len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
        },
        kpis,
        charts: Charts {
            performance,
            volatility,
            drawdown,
            correlation,
            scatter,
        },
        regression: report.regression,
        footer: footer_note(ctx, w),
    }
}

fn dense(label: &str, dates: &[NaiveDate], values: &[f64]) -> TimeSeries {
    TimeSeries {
        label: label.to_string(),
        points: dates.iter().copied().zip(values.iter().copied()).collect(),
    }
}

fn sparse_rows(label: &str, dates: &[NaiveDate], values: &[Option<f64>], rows: &[usize]) -> TimeSeries {
    TimeSeries {
        label: label.to_string(),
        points: rows
            .iter()
            .filter_map(|&i| values[i].map(|v| (dates[i], v)))
            .collect(),
    }
}

fn weight_caption(composite: &CompositeSpec, weight: CompositeWeight) -> String {
    format!(
        "{}: {:.0}%  |  {}: {:.0}%",
        composite.first,
        weight.first() * 100.0,
        composite.second,
        weight.second() * 100.0
    )
}

fn footer_note(ctx: &ViewContext<'_>, window: usize) -> String {
    format!(
        "Data: {}. {} = weighted {}/{} returns ({}). Metrics use a {window} trading-day rolling window. \
         Beta estimated via OLS on daily returns.",
        ctx.source,
        ctx.composite.label,
        ctx.composite.first,
        ctx.composite.second,
        weight_caption(ctx.composite, ctx.weight),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{analyze, compute_returns};
    use crate::domain::{PriceTable, StatsConfig};

    fn view_for(n: usize, amp: f64) -> DashboardView {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..n).map(|i| start + chrono::Days::new(i as u64)).collect();
        let walk = |phase: f64| -> Vec<Option<f64>> {
            let mut p = 50.0;
            (0..n)
                .map(|i| {
                    if i > 0 {
                        p *= 1.0 + amp * ((i as f64) * 1.7 + phase).sin();
                    }
                    Some(p)
                })
                .collect()
        };
        let table = PriceTable::new(
            dates,
            vec![
                (Symbol::new("BLK"), walk(0.4)),
                (Symbol::new("NVDA"), walk(0.0)),
                (Symbol::new("MSFT"), walk(2.2)),
                (Symbol::new("^IXIC"), walk(1.0)),
            ],
        );
        let composite = CompositeSpec {
            first: Symbol::new("NVDA"),
            second: Symbol::new("MSFT"),
            label: "AI Composite".to_string(),
        };
        let returns = compute_returns(&table, &composite, CompositeWeight::HALF).unwrap();
        let report = analyze(&returns, &Symbol::new("BLK"), &Symbol::new("^IXIC"), StatsConfig::default()).unwrap();
        let target = Symbol::new("BLK");
        build_view(
            &report,
            &ViewContext {
                target: &target,
                composite: &composite,
                weight: CompositeWeight::HALF,
                benchmark: Benchmark::Nasdaq,
                span: Span::OneYear,
                source: "Test",
                price_rows: n,
            },
        )
    }

    #[test]
    fn kpi_values_render_with_placeholder() {
        assert_eq!(KpiValue::Percent(0.1234).to_string(), "12.34%");
        assert_eq!(KpiValue::Ratio(0.8549).to_string(), "0.85");
        assert_eq!(KpiValue::Unavailable.to_string(), "—");
        assert_eq!(KpiValue::ratio(Ok(f64::NAN)), KpiValue::Unavailable);
        assert_eq!(
            KpiValue::percent(Err(StatError::UnavailableStatistic { window: 30 })),
            KpiValue::Unavailable
        );
    }

    #[test]
    fn view_has_five_kpis_and_labeled_charts() {
        let view = view_for(60, 0.01);

        let labels: Vec<&str> = view.kpis.iter().map(|k| k.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "BLK Return (Selected Period)",
                "AI Composite Return (Selected Period)",
                "30D Correlation (BLK vs AI Composite)",
                "BLK 30D Volatility (Ann.)",
                "Beta vs AI Composite (OLS)",
            ]
        );

        let perf = &view.charts.performance;
        assert_eq!(perf.title, "Performance Comparison (Cumulative Return)");
        assert_eq!(perf.y_label, "Growth of $1");
        let series: Vec<&str> = perf.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(series, vec!["BLK", "AI Composite", "Benchmark"]);
        assert!(perf.series.iter().all(|s| s.points.len() == 59));

        assert_eq!(view.charts.volatility.title, "Risk Analysis (Rolling Volatility, 30D)");
        assert_eq!(view.charts.volatility.series[0].points.len(), 30);
        assert_eq!(view.charts.drawdown.title, "Drawdown (BLK)");
        assert_eq!(view.charts.correlation.series[0].points.len(), 30);

        let scatter = &view.charts.scatter;
        assert!(scatter.title.starts_with("Sensitivity (Beta) & Fit | R²="));
        assert_eq!(scatter.x_label, "AI Composite Daily Return");
        assert_eq!(scatter.y_label, "BLK Daily Return");
        assert_eq!(scatter.points.len(), 59);
        assert!(scatter.fit.is_some());

        assert_eq!(view.header.return_rows, 59);
        assert_eq!(view.weight_caption(), "NVDA: 50%  |  MSFT: 50%");
        assert!(view.footer.contains("30 trading-day rolling window"));
    }

    #[test]
    fn short_history_shows_placeholders_not_numbers() {
        let view = view_for(20, 0.01);
        assert_eq!(view.kpis[2].value, KpiValue::Unavailable);
        assert_eq!(view.kpis[3].value, KpiValue::Unavailable);
        assert!(view.charts.correlation.is_empty());
        assert!(view.charts.volatility.is_empty());
        assert!(matches!(view.kpis[0].value, KpiValue::Percent(_)));
    }
}
