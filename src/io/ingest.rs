//! Local CSV price files.
//!
//! Two layouts are accepted:
//!
//! - **wide**: `Date,SYM1,SYM2,...` with one close column per symbol
//! - **long**: `Date,Symbol,Close[,Adj Close,...]` with one row per (date, symbol)
//!
//! Both produce a grouped [`RawPriceFrame`] so the regular normalizer applies.
//! Rows with an unparseable date are skipped and counted; empty or
//! non-numeric cells become missing values.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::data::{FIELD_ADJ_CLOSE, FIELD_CLOSE, PriceSource, RawPriceFrame};
use crate::domain::{Span, Symbol};
use crate::error::FetchError;

/// Price source backed by a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_frame(&self) -> Result<RawPriceFrame, FetchError> {
        let file_error = |message: String| FetchError::File {
            path: self.path.display().to_string(),
            message,
        };
        let file = File::open(&self.path).map_err(|e| file_error(e.to_string()))?;
        parse_price_csv(file).map_err(file_error)
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "Local CSV"
    }

    fn fetch(&self, symbols: &[Symbol], span: Span) -> Result<RawPriceFrame, FetchError> {
        let mut frame = self.read_frame()?;

        // The file's own latest date anchors the span.
        if let Some(end) = frame.last_date() {
            frame.retain_since(span.start_date(end));
        }
        if let crate::data::RawColumns::Grouped(columns) = &mut frame.columns {
            columns.retain(|(_, symbol), _| symbols.contains(symbol));
        }

        debug!(path = %self.path.display(), rows = frame.index.len(), "loaded price file");
        Ok(frame)
    }
}

/// Which shape the header row describes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    Wide { symbols: Vec<(usize, Symbol)> },
    Long { symbol: usize, fields: Vec<(usize, String)> },
}

/// Parse a price CSV from any reader.
pub fn parse_price_csv<R: Read>(reader: R) -> Result<RawPriceFrame, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| format!("failed to read CSV headers: {e}"))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = *header_map
        .get("date")
        .ok_or_else(|| "missing required column: `Date`".to_string())?;
    let layout = resolve_layout(&headers, &header_map, date_idx)?;

    let mut observations: BTreeMap<(String, Symbol), Vec<(NaiveDate, f64)>> = BTreeMap::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping unreadable CSV row");
                skipped += 1;
                continue;
            }
        };
        let Some(date) = record.get(date_idx).and_then(|s| parse_date(s).ok()) else {
            skipped += 1;
            continue;
        };

        match &layout {
            Layout::Wide { symbols } => {
                for (idx, symbol) in symbols {
                    let key = (FIELD_CLOSE.to_string(), symbol.clone());
                    let entry = observations.entry(key).or_default();
                    if let Some(v) = parse_opt_f64(record.get(*idx)) {
                        entry.push((date, v));
                    }
                }
            }
            Layout::Long { symbol, fields } => {
                let Some(symbol) = record.get(*symbol).filter(|s| !s.is_empty()).map(Symbol::new) else {
                    skipped += 1;
                    continue;
                };
                for (idx, field) in fields {
                    let entry = observations.entry((field.clone(), symbol.clone())).or_default();
                    if let Some(v) = parse_opt_f64(record.get(*idx)) {
                        entry.push((date, v));
                    }
                }
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped CSV rows without a valid date or symbol");
    }

    // A separate adjusted column means `Close` is the raw close.
    let adjusted_at_source = match &layout {
        Layout::Wide { .. } => true,
        Layout::Long { fields, .. } => !fields.iter().any(|(_, f)| f == FIELD_ADJ_CLOSE),
    };

    Ok(RawPriceFrame::from_observations(
        observations.into_iter().collect(),
        adjusted_at_source,
    ))
}

fn resolve_layout(
    headers: &StringRecord,
    header_map: &HashMap<String, usize>,
    date_idx: usize,
) -> Result<Layout, String> {
    if let Some(&symbol) = header_map.get("symbol").or_else(|| header_map.get("ticker")) {
        let fields: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != date_idx && *idx != symbol)
            .map(|(idx, name)| (idx, canonical_field(name)))
            .collect();
        if !fields.iter().any(|(_, f)| f == FIELD_CLOSE || f == FIELD_ADJ_CLOSE) {
            return Err("long layout requires a `Close` or `Adj Close` column".to_string());
        }
        return Ok(Layout::Long { symbol, fields });
    }

    let symbols: Vec<(usize, Symbol)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| *idx != date_idx && !clean_header(name).is_empty())
        .map(|(idx, name)| (idx, Symbol::new(clean_header(name))))
        .collect();
    if symbols.is_empty() {
        return Err("wide layout requires at least one symbol column".to_string());
    }
    Ok(Layout::Wide { symbols })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (clean_header(name).to_ascii_lowercase(), idx))
        .collect()
}

fn clean_header(name: &str) -> &str {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}')
}

/// Map header spellings onto the field names the normalizer looks for.
fn canonical_field(name: &str) -> String {
    let name = clean_header(name);
    let squashed: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match squashed.as_str() {
        "close" => FIELD_CLOSE.to_string(),
        "adjclose" | "adjustedclose" => FIELD_ADJ_CLOSE.to_string(),
        _ => name.to_string(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO first; provider exports also use `YYYY/MM/DD` or a timestamp suffix.
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}'. Expected YYYY-MM-DD."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
