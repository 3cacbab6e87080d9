//! Debug bundle writer for inspecting one render pass.
//!
//! The bundle is a Markdown file under `debug/` with the controls, the KPI
//! block, the regression, and the tail of every chart series.

use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::Controls;
use crate::error::AppError;
use crate::report::{DashboardView, TimeChart, UNAVAILABLE};

/// Rows of each series included in the bundle.
const TAIL_ROWS: usize = 10;

pub fn write_debug_bundle(view: &DashboardView, controls: &Controls) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), view, controls)
}

pub fn write_debug_bundle_in(dir: &Path, view: &DashboardView, controls: &Controls) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "aix_debug_{}_{}_w{:02}_{ts}.md",
        view.header.target,
        controls.span.months(),
        (controls.weight.first() * 100.0).round() as u32,
    ));

    let body = render_bundle(view, controls);
    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    file.write_all(body.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;

    tracing::info!(path = %path.display(), "wrote debug bundle");
    Ok(path)
}

fn render_bundle(view: &DashboardView, controls: &Controls) -> String {
    let h = &view.header;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# aix debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- source: {}", h.source);
    let _ = writeln!(out, "- target: {}", h.target);
    let _ = writeln!(
        out,
        "- composite: {} = {}",
        h.composite.label,
        view.weight_caption()
    );
    let _ = writeln!(out, "- benchmark: {}", controls.benchmark.display_name());
    let _ = writeln!(out, "- span: {}", controls.span.display_name());
    let _ = writeln!(out, "- refresh: {}", controls.refresh);
    let _ = writeln!(out, "- window: {}", h.window);
    let _ = writeln!(
        out,
        "- rows: prices={} returns={} ({} .. {})",
        h.price_rows,
        h.return_rows,
        h.first_date.map(|d| d.to_string()).unwrap_or_else(|| UNAVAILABLE.to_string()),
        h.last_date.map(|d| d.to_string()).unwrap_or_else(|| UNAVAILABLE.to_string()),
    );

    let _ = writeln!(out, "\n## KPIs");
    let _ = writeln!(out, "| label | value |");
    let _ = writeln!(out, "| - | - |");
    for kpi in &view.kpis {
        let _ = writeln!(out, "| {} | {} |", kpi.label, kpi.value);
    }

    let _ = writeln!(out, "\n## Regression");
    match &view.regression {
        Ok(fit) => {
            let _ = writeln!(
                out,
                "beta={:.6} intercept={:.8} r2={} n={}",
                fit.beta,
                fit.intercept,
                fit.r_squared.map(|v| format!("{v:.6}")).unwrap_or_else(|| UNAVAILABLE.to_string()),
                fit.n_obs
            );
        }
        Err(e) => {
            let _ = writeln!(out, "undefined: {e}");
        }
    }

    let charts = &view.charts;
    for chart in [&charts.performance, &charts.volatility, &charts.drawdown, &charts.correlation] {
        write_chart_tail(&mut out, chart);
    }

    let _ = writeln!(out, "\n## {}", charts.scatter.title);
    let _ = writeln!(out, "| {} | {} |", charts.scatter.x_label, charts.scatter.y_label);
    let _ = writeln!(out, "| - | - |");
    let skip = charts.scatter.points.len().saturating_sub(TAIL_ROWS);
    for (x, y) in charts.scatter.points.iter().skip(skip) {
        let _ = writeln!(out, "| {x:.6} | {y:.6} |");
    }

    out
}

fn write_chart_tail(out: &mut String, chart: &TimeChart) {
    let _ = writeln!(out, "\n## {}", chart.title);
    for series in &chart.series {
        let _ = writeln!(out, "\n### {} ({} points)", series.label, series.points.len());
        if series.points.is_empty() {
            let _ = writeln!(out, "{UNAVAILABLE}");
            continue;
        }
        let _ = writeln!(out, "| date | {} |", chart.y_label);
        let _ = writeln!(out, "| - | - |");
        let skip = series.points.len().saturating_sub(TAIL_ROWS);
        for (date, value) in series.points.iter().skip(skip) {
            let _ = writeln!(out, "| {date} | {value:.6} |");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{Dashboard, RenderSettings};
    use crate::data::{MemoryCache, SyntheticSource};
    use crate::domain::{CompositeSpec, StatsConfig, Symbol};

    #[test]
    fn bundle_lists_kpis_and_series_tails() {
        let source = SyntheticSource::new(5).with_end(chrono::NaiveDate::from_ymd_opt(2025, 5, 30).unwrap());
        let mut dash = Dashboard::new(
            Box::new(source),
            Box::new(MemoryCache::new()),
            RenderSettings {
                target: Symbol::new("BLK"),
                composite: CompositeSpec {
                    first: Symbol::new("NVDA"),
                    second: Symbol::new("MSFT"),
                    label: "AI Composite".to_string(),
                },
                stats: StatsConfig::default(),
                min_rows: 40,
                cache_ttl: std::time::Duration::from_secs(60),
            },
        );
        let controls = Controls::default();
        let view = dash.render(&controls).unwrap();

        let dir = std::env::temp_dir().join(format!("aix_debug_{}", std::process::id()));
        let path = write_debug_bundle_in(&dir, &view, &controls).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(text.starts_with("# aix debug bundle"));
        assert!(text.contains("| Beta vs AI Composite (OLS) |"));
        assert!(text.contains("## Drawdown (BLK)"));
        assert!(text.contains("## Sensitivity (Beta) & Fit"));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("aix_debug_BLK_12_w50_"));
    }
}
