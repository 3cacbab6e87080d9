//! Shared render pipeline used by the report, export, and TUI front-ends.
//!
//! One call to [`Dashboard::render`] is one top-to-bottom pass:
//! cached fetch -> normalize -> returns/composite -> statistics -> view
//!
//! The front-ends only decide how to present the resulting [`DashboardView`].

use std::time::Duration;

use tracing::{info, warn};

use crate::analytics::{analyze, compute_returns};
use crate::config::{Settings, SourceKind};
use crate::data::{CacheKey, MemoryCache, PriceCache, PriceSource, SyntheticSource, YahooClient, normalize_prices};
use crate::domain::{CompositeSpec, Controls, StatsConfig, Symbol};
use crate::error::{AppError, PipelineError};
use crate::io::CsvPriceSource;
use crate::report::{DashboardView, ViewContext, build_view};

/// Parameters that stay fixed across render passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub target: Symbol,
    pub composite: CompositeSpec,
    pub stats: StatsConfig,
    pub min_rows: usize,
    pub cache_ttl: Duration,
}

impl From<&Settings> for RenderSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            target: settings.target.clone(),
            composite: settings.composite_spec(),
            stats: settings.stats,
            min_rows: settings.min_rows,
            cache_ttl: settings.cache_ttl(),
        }
    }
}

/// The dashboard: a price source, the cache in front of it, and fixed settings.
pub struct Dashboard {
    source: Box<dyn PriceSource>,
    cache: Box<dyn PriceCache>,
    settings: RenderSettings,
}

impl Dashboard {
    pub fn new(source: Box<dyn PriceSource>, cache: Box<dyn PriceCache>, settings: RenderSettings) -> Self {
        Self {
            source,
            cache,
            settings,
        }
    }

    /// Build the configured source with a fresh in-memory cache.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let source = build_source(settings)?;
        Ok(Self::new(source, Box::new(MemoryCache::new()), RenderSettings::from(settings)))
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Symbols one render pass needs, in display order.
    pub fn symbols(&self, controls: &Controls) -> Vec<Symbol> {
        let mut symbols = vec![
            self.settings.target.clone(),
            self.settings.composite.first.clone(),
            self.settings.composite.second.clone(),
        ];
        let benchmark = controls.benchmark.symbol();
        if !symbols.contains(&benchmark) {
            symbols.push(benchmark);
        }
        symbols
    }

    /// Run one render pass. Any error halts the pass; no partial view is produced.
    pub fn render(&mut self, controls: &Controls) -> Result<DashboardView, PipelineError> {
        let symbols = self.symbols(controls);
        let key = CacheKey::new(&symbols, controls.span);

        if controls.refresh {
            info!(?key, "refresh requested");
            self.cache.invalidate(&key);
        }

        let source = &self.source;
        let span = controls.span;
        let mut fetch = || {
            info!(source = source.name(), symbols = ?symbols, span = ?span, "fetching prices");
            source.fetch(&symbols, span)
        };
        let raw = self
            .cache
            .get_or_fetch(&key, self.settings.cache_ttl, &mut fetch)
            .map_err(|e| {
                warn!(error = %e, "price fetch failed");
                PipelineError::NoData(e.to_string())
            })?;

        let prices = normalize_prices(&raw, &symbols, self.settings.min_rows)?;
        let returns = compute_returns(&prices, &self.settings.composite, controls.weight)?;
        // Gaps in one symbol can shrink the return table well below the price rows.
        let min_returns = self.settings.min_rows.saturating_sub(1);
        if returns.len() < min_returns {
            warn!(return_rows = returns.len(), min_returns, "too few overlapping returns");
            return Err(PipelineError::NoData(format!(
                "{} overlapping return rows, need at least {min_returns}",
                returns.len()
            )));
        }
        let benchmark = controls.benchmark.symbol();
        let report = analyze(&returns, &self.settings.target, &benchmark, self.settings.stats)?;

        info!(
            price_rows = prices.len(),
            return_rows = returns.len(),
            weight = controls.weight.first(),
            "render complete"
        );

        Ok(build_view(
            &report,
            &ViewContext {
                target: &self.settings.target,
                composite: &self.settings.composite,
                weight: controls.weight,
                benchmark: controls.benchmark,
                span: controls.span,
                source: self.source.name(),
                price_rows: prices.len(),
            },
        ))
    }
}

/// Construct the price source named by `settings.source`.
pub fn build_source(settings: &Settings) -> Result<Box<dyn PriceSource>, AppError> {
    match settings.source {
        SourceKind::Yahoo => {
            let client = YahooClient::new(&settings.yahoo)
                .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
            Ok(Box::new(client))
        }
        SourceKind::Csv => {
            let path = settings
                .prices_path
                .clone()
                .ok_or_else(|| AppError::new(2, "source = csv requires --prices FILE"))?;
            Ok(Box::new(CsvPriceSource::new(path)))
        }
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new(settings.seed))),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::{FIELD_CLOSE, RawColumns, RawPriceFrame};
    use crate::domain::{Benchmark, CompositeWeight, Span};
    use crate::error::{FetchError, StatError};
    use crate::report::KpiValue;

    /// Serves a fixed frame and counts calls.
    struct StubSource {
        frame: RawPriceFrame,
        calls: Rc<Cell<usize>>,
    }

    impl PriceSource for StubSource {
        fn name(&self) -> &str {
            "Stub"
        }

        fn fetch(&self, _symbols: &[Symbol], _span: Span) -> Result<RawPriceFrame, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.frame.clone())
        }
    }

    struct FailingSource;

    impl PriceSource for FailingSource {
        fn name(&self) -> &str {
            "Failing"
        }

        fn fetch(&self, _symbols: &[Symbol], _span: Span) -> Result<RawPriceFrame, FetchError> {
            Err(FetchError::Invalid("connection refused".to_string()))
        }
    }

    fn frame(columns: Vec<(&str, Vec<f64>)>) -> RawPriceFrame {
        let n = columns[0].1.len();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let index = (0..n).map(|i| start + chrono::Days::new(i as u64)).collect();
        let grouped: BTreeMap<(String, Symbol), Vec<Option<f64>>> = columns
            .into_iter()
            .map(|(s, v)| ((FIELD_CLOSE.to_string(), Symbol::new(s)), v.into_iter().map(Some).collect()))
            .collect();
        RawPriceFrame {
            index,
            columns: RawColumns::Grouped(grouped),
            adjusted_at_source: true,
        }
    }

    fn prices_from_returns(returns: &[f64]) -> Vec<f64> {
        let mut p = 100.0;
        let mut out = vec![p];
        for r in returns {
            p *= 1.0 + r;
            out.push(p);
        }
        out
    }

    fn settings(target: &str, first: &str, second: &str) -> RenderSettings {
        RenderSettings {
            target: Symbol::new(target),
            composite: CompositeSpec {
                first: Symbol::new(first),
                second: Symbol::new(second),
                label: "Composite".to_string(),
            },
            stats: StatsConfig::default(),
            min_rows: 40,
            cache_ttl: Duration::from_secs(3600),
        }
    }

    fn dashboard(frame: RawPriceFrame, target: &str) -> (Dashboard, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let source = StubSource {
            frame,
            calls: Rc::clone(&calls),
        };
        let dash = Dashboard::new(
            Box::new(source),
            Box::new(MemoryCache::new()),
            settings(target, "A", "B"),
        );
        (dash, calls)
    }

    #[test]
    fn proportional_target_has_beta_point_six_and_unit_r_squared() {
        let n = 60;
        let a: Vec<f64> = (0..n - 1).map(|i| 0.01 + 0.004 * ((i as f64) * 0.8).sin()).collect();
        let b: Vec<f64> = (0..n - 1).map(|i| 0.01 + 0.003 * ((i as f64) * 1.9).cos()).collect();
        let composite: Vec<f64> = a.iter().zip(&b).map(|(x, y)| 0.5 * x + 0.5 * y).collect();
        let t: Vec<f64> = composite.iter().map(|c| 0.6 * c).collect();
        let bench: Vec<f64> = vec![0.002; n - 1];

        let raw = frame(vec![
            ("T", prices_from_returns(&t)),
            ("A", prices_from_returns(&a)),
            ("B", prices_from_returns(&b)),
            ("^IXIC", prices_from_returns(&bench)),
        ]);
        let (mut dash, _) = dashboard(raw, "T");

        let view = dash.render(&Controls::default()).unwrap();
        let fit = view.regression.unwrap();
        assert!((fit.beta - 0.6).abs() < 1e-6, "beta = {}", fit.beta);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(view.kpis[4].value.to_string(), "0.60");
        assert_eq!(view.header.price_rows, 60);
        assert_eq!(view.header.return_rows, 59);
        assert!(view.charts.scatter.title.contains("R²=1.00"));
    }

    #[test]
    fn constant_one_percent_scenario_has_undefined_beta() {
        // A and B rise 1% every row, so the composite has zero variance.
        let n = 60;
        let rising = |rate: f64| -> Vec<f64> { (0..n).map(|i| 100.0 * (1.0 + rate).powi(i)).collect() };
        let raw = frame(vec![
            ("T", rising(0.006)),
            ("A", rising(0.01)),
            ("B", rising(0.01)),
            ("^IXIC", rising(0.004)),
        ]);
        let (mut dash, _) = dashboard(raw, "T");

        let view = dash.render(&Controls::default()).unwrap();
        assert_eq!(view.regression, Err(StatError::DegenerateRegression));
        assert_eq!(view.kpis[4].value, KpiValue::Unavailable);
        assert!(view.charts.scatter.fit.is_none());
        assert!(view.charts.scatter.title.contains("Beta=—"));

        let total = 1.006f64.powi(59) - 1.0;
        assert!((view.kpis[0].value.as_f64().unwrap() - total).abs() < 1e-9);
    }

    #[test]
    fn ten_rows_is_no_data() {
        let ten = |base: f64| (0..10).map(|i| base + i as f64).collect::<Vec<_>>();
        let raw = frame(vec![
            ("T", ten(10.0)),
            ("A", ten(20.0)),
            ("B", ten(30.0)),
            ("^IXIC", ten(40.0)),
        ]);
        let (mut dash, _) = dashboard(raw, "T");
        assert!(matches!(dash.render(&Controls::default()), Err(PipelineError::NoData(_))));
    }

    #[test]
    fn absent_symbol_is_named() {
        let rows = |base: f64| (0..60).map(|i| base + i as f64).collect::<Vec<_>>();
        let raw = frame(vec![("X", rows(10.0)), ("A", rows(20.0)), ("B", rows(30.0)), ("^IXIC", rows(40.0))]);
        let calls = Rc::new(Cell::new(0));
        let mut dash = Dashboard::new(
            Box::new(StubSource { frame: raw, calls }),
            Box::new(MemoryCache::new()),
            settings("Y", "A", "B"),
        );

        assert_eq!(
            dash.render(&Controls::default()).unwrap_err(),
            PipelineError::MissingSymbols(vec![Symbol::new("Y")])
        );
    }

    #[test]
    fn symbol_without_any_price_is_named() {
        let rows = |base: f64| (0..60).map(|i| base + i as f64).collect::<Vec<_>>();
        let mut raw = frame(vec![("T", rows(10.0)), ("A", rows(20.0)), ("B", rows(30.0)), ("^IXIC", rows(40.0))]);
        if let RawColumns::Grouped(cols) = &mut raw.columns {
            cols.insert((FIELD_CLOSE.to_string(), Symbol::new("T")), vec![None; 60]);
        }
        let (mut dash, _) = dashboard(raw, "T");

        assert_eq!(
            dash.render(&Controls::default()).unwrap_err(),
            PipelineError::MissingSymbols(vec![Symbol::new("T")])
        );
    }

    #[test]
    fn sparse_target_below_return_floor_is_no_data() {
        let rows = |base: f64| (0..60).map(|i| base + i as f64).collect::<Vec<_>>();
        let mut raw = frame(vec![("T", rows(10.0)), ("A", rows(20.0)), ("B", rows(30.0)), ("^IXIC", rows(40.0))]);
        if let RawColumns::Grouped(cols) = &mut raw.columns {
            let sparse = (0..60).map(|i| (i >= 55).then_some(10.0 + i as f64)).collect();
            cols.insert((FIELD_CLOSE.to_string(), Symbol::new("T")), sparse);
        }
        let (mut dash, _) = dashboard(raw, "T");

        match dash.render(&Controls::default()) {
            Err(PipelineError::NoData(detail)) => assert!(detail.contains("4 overlapping return rows")),
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn fetch_failure_becomes_no_data() {
        let mut dash = Dashboard::new(
            Box::new(FailingSource),
            Box::new(MemoryCache::new()),
            settings("T", "A", "B"),
        );
        match dash.render(&Controls::default()) {
            Err(PipelineError::NoData(detail)) => assert!(detail.contains("connection refused")),
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn cache_is_reused_until_refresh() {
        let raw = SyntheticSource::new(7)
            .with_end(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
            .fetch(
                &[Symbol::new("T"), Symbol::new("A"), Symbol::new("B"), Symbol::new("^IXIC")],
                Span::OneYear,
            )
            .unwrap();
        let (mut dash, calls) = dashboard(raw, "T");

        let controls = Controls::default();
        dash.render(&controls).unwrap();
        let reweighted = Controls {
            weight: CompositeWeight::new(0.8).unwrap(),
            ..controls
        };
        dash.render(&reweighted).unwrap();
        assert_eq!(calls.get(), 1, "weight changes must not refetch");

        dash.render(&Controls {
            refresh: true,
            ..controls
        })
        .unwrap();
        assert_eq!(calls.get(), 2);

        // A different benchmark is a different key.
        dash.render(&Controls {
            benchmark: Benchmark::Sp500,
            ..controls
        })
        .unwrap_err();
        assert_eq!(calls.get(), 3);
    }
}
