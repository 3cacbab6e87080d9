//! Yahoo Finance chart API integration.
//!
//! One request per symbol (fanned out with rayon), joined on the union of
//! trading dates into a grouped `(field, symbol)` frame.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::YahooSettings;
use crate::domain::{Span, Symbol};
use crate::error::FetchError;

use super::{FIELD_ADJ_CLOSE, FIELD_CLOSE, PriceSource, RawPriceFrame};

const CHART_PATH: &str = "/v8/finance/chart";

pub struct YahooClient {
    client: Client,
    base_url: String,
    auto_adjust: bool,
}

impl YahooClient {
    pub fn new(settings: &YahooSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| FetchError::Http {
                symbol: "-".to_string(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auto_adjust: settings.auto_adjust,
        })
    }

    fn fetch_symbol(&self, symbol: &Symbol, start: NaiveDate, end: DateTime<Utc>) -> Result<SymbolSeries, FetchError> {
        let url = format!("{}{CHART_PATH}/{}", self.base_url, encode_symbol(symbol));
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "div|split".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .map_err(|e| FetchError::Http {
                symbol: symbol.to_string(),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body: ChartResponse = resp.json().map_err(|e| FetchError::Http {
            symbol: symbol.to_string(),
            source: e,
        })?;

        parse_chart(symbol, body)
    }
}

impl PriceSource for YahooClient {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn fetch(&self, symbols: &[Symbol], span: Span) -> Result<RawPriceFrame, FetchError> {
        let end = Utc::now();
        let start = span.start_date(end.date_naive());
        info!(symbols = symbols.len(), %start, "fetching Yahoo chart data");

        let results: Vec<(Symbol, Result<SymbolSeries, FetchError>)> = symbols
            .par_iter()
            .map(|s| (s.clone(), self.fetch_symbol(s, start, end)))
            .collect();

        let mut series = Vec::new();
        let mut last_err = None;
        for (symbol, result) in results {
            match result {
                Ok(s) => series.push((symbol, s)),
                Err(e) => {
                    // Partial downloads are allowed; the symbol surfaces as missing.
                    warn!(%symbol, error = %e, "symbol download failed");
                    last_err = Some(e);
                }
            }
        }

        if series.is_empty() {
            return Err(last_err.unwrap_or_else(|| FetchError::Invalid("no symbols requested".to_string())));
        }

        let frame = assemble_frame(series, self.auto_adjust);
        info!(rows = frame.index.len(), "Yahoo download complete");
        Ok(frame)
    }
}

/// Daily observations for one symbol.
#[derive(Debug, Clone, Default)]
struct SymbolSeries {
    open: Vec<(NaiveDate, f64)>,
    high: Vec<(NaiveDate, f64)>,
    low: Vec<(NaiveDate, f64)>,
    close: Vec<(NaiveDate, f64)>,
    adj_close: Vec<(NaiveDate, f64)>,
    volume: Vec<(NaiveDate, f64)>,
}

/// Lay per-symbol series out as a grouped frame.
///
/// With `auto_adjust`, `Close` carries the adjusted close (falling back to the
/// raw close when the provider omitted it). Without it, the raw close and a
/// separate `Adj Close` are both emitted.
fn assemble_frame(series: Vec<(Symbol, SymbolSeries)>, auto_adjust: bool) -> RawPriceFrame {
    let mut observations = Vec::new();
    let mut adjusted = auto_adjust;

    for (symbol, s) in series {
        let key = |field: &str| (field.to_string(), symbol.clone());
        observations.push((key("Open"), s.open));
        observations.push((key("High"), s.high));
        observations.push((key("Low"), s.low));
        observations.push((key("Volume"), s.volume));

        if auto_adjust {
            if s.adj_close.is_empty() {
                warn!(%symbol, "no adjusted close returned; Close is unadjusted");
                adjusted = false;
                observations.push((key(FIELD_CLOSE), s.close));
            } else {
                observations.push((key(FIELD_CLOSE), s.adj_close));
            }
        } else {
            observations.push((key(FIELD_CLOSE), s.close));
            if !s.adj_close.is_empty() {
                observations.push((key(FIELD_ADJ_CLOSE), s.adj_close));
            }
        }
    }

    RawPriceFrame::from_observations(observations, adjusted)
}

fn parse_chart(symbol: &Symbol, body: ChartResponse) -> Result<SymbolSeries, FetchError> {
    if let Some(err) = body.chart.error {
        return Err(FetchError::Provider {
            symbol: symbol.to_string(),
            message: format!("{} - {}", err.code, err.description),
        });
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::Provider {
            symbol: symbol.to_string(),
            message: "empty result".to_string(),
        })?;

    let timestamps = result.timestamp.unwrap_or_default();
    let mut dates = Vec::with_capacity(timestamps.len());
    for ts in timestamps {
        let date = DateTime::<Utc>::from_timestamp(ts, 0)
            .ok_or_else(|| FetchError::Invalid(format!("bad timestamp {ts} for {symbol}")))?
            .date_naive();
        dates.push(date);
    }

    let pick = |values: &[Option<f64>]| -> Vec<(NaiveDate, f64)> {
        dates
            .iter()
            .zip(values.iter())
            .filter_map(|(d, v)| v.filter(|x| x.is_finite()).map(|x| (*d, x)))
            .collect()
    };

    let mut out = SymbolSeries::default();
    if let Some(quote) = result.indicators.quote.into_iter().next() {
        out.open = pick(&quote.open);
        out.high = pick(&quote.high);
        out.low = pick(&quote.low);
        out.close = pick(&quote.close);
        out.volume = pick(&quote.volume);
    }
    if let Some(adj) = result.indicators.adjclose.and_then(|a| a.into_iter().next()) {
        out.adj_close = pick(&adj.adjclose);
    }

    Ok(out)
}

/// Index symbols (`^IXIC`) need the caret percent-encoded in the path.
fn encode_symbol(symbol: &Symbol) -> String {
    symbol.as_str().replace('^', "%5E")
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}
