//! Plain-text rendering of a dashboard view for terminal output.
//!
//! We keep formatting code in one place so the statistics code stays clean
//! and output changes are localized.

use super::{DashboardView, Kpi, UNAVAILABLE};

/// Format the full run summary: header, controls, KPI block, regression, footer.
pub fn format_dashboard(view: &DashboardView) -> String {
    let h = &view.header;
    let mut out = String::new();

    out.push_str("=== aix - Market Sensitivity & Risk Dashboard ===\n");
    out.push_str(&format!(
        "Target: {} | Composite: {} ({}) | Benchmark: {}\n",
        h.target,
        h.composite.label,
        view.weight_caption(),
        h.benchmark.display_name(),
    ));
    let range = match (h.first_date, h.last_date) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        _ => UNAVAILABLE.to_string(),
    };
    out.push_str(&format!(
        "Period: {} | {range} | prices n={} | returns n={}\n",
        h.span.display_name(),
        h.price_rows,
        h.return_rows,
    ));

    out.push('\n');
    out.push_str(&format_kpis(&view.kpis));

    out.push_str("\nRegression (target ~ 1 + composite):\n");
    match &view.regression {
        Ok(fit) => {
            let r2 = fit
                .r_squared
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| UNAVAILABLE.to_string());
            out.push_str(&format!(
                "- beta={:.4} intercept={:.6} R²={r2} n={}\n",
                fit.beta, fit.intercept, fit.n_obs
            ));
        }
        Err(e) => out.push_str(&format!("- beta={UNAVAILABLE} R²={UNAVAILABLE} ({e})\n")),
    }

    out.push('\n');
    out.push_str(&view.footer);
    out.push('\n');
    out
}

/// Two-column KPI table.
pub fn format_kpis(kpis: &[Kpi]) -> String {
    let width = kpis
        .iter()
        .map(|k| k.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for kpi in kpis {
        let pad = width - kpi.label.chars().count();
        out.push_str(&format!("{}{}  {:>10}\n", kpi.label, " ".repeat(pad), kpi.value.to_string()));
    }
    out
}
