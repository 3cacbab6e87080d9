//! Strongly-typed settings.
//!
//! Every field has a default so the binary runs without any config file.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{Benchmark, CompositeSpec, CompositeWeight, Span, StatsConfig, Symbol};

use super::ConfigError;

/// Where prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Yahoo Finance chart API (network).
    Yahoo,
    /// A local CSV file (`prices_path`).
    Csv,
    /// Seeded synthetic random walks (offline demo).
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub first: Symbol,
    pub second: Symbol,
    pub label: String,
    /// Initial share of `first`; `second` gets the rest.
    pub weight: CompositeWeight,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            first: Symbol::new("NVDA"),
            second: Symbol::new("MSFT"),
            label: "AI Composite".to_string(),
            weight: CompositeWeight::HALF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Ask for adjusted prices in the `Close` field (splits + dividends).
    pub auto_adjust: bool,
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 20,
            user_agent: "Mozilla/5.0".to_string(),
            auto_adjust: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub target: Symbol,
    pub composite: CompositeSettings,
    pub span: Span,
    pub benchmark: Benchmark,
    pub stats: StatsConfig,
    /// Fewer normalized rows than this is treated as "no data".
    pub min_rows: usize,
    pub cache_ttl_secs: u64,
    pub source: SourceKind,
    pub prices_path: Option<PathBuf>,
    pub seed: u64,
    pub yahoo: YahooSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: Symbol::new("BLK"),
            composite: CompositeSettings::default(),
            span: Span::OneYear,
            benchmark: Benchmark::Nasdaq,
            stats: StatsConfig::default(),
            min_rows: 40,
            cache_ttl_secs: 60 * 60,
            source: SourceKind::Yahoo,
            prices_path: None,
            seed: 42,
            yahoo: YahooSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.stats.window < 2 {
            return invalid(format!("stats.window must be >= 2, got {}", self.stats.window));
        }
        if !(self.stats.annualization.is_finite() && self.stats.annualization > 0.0) {
            return invalid(format!(
                "stats.annualization must be a positive number, got {}",
                self.stats.annualization
            ));
        }
        let floor = self.stats.window.saturating_add(1);
        if self.min_rows < floor {
            return invalid(format!(
                "min_rows ({}) must be at least window + 1 ({floor})",
                self.min_rows
            ));
        }
        for (name, symbol) in [
            ("target", &self.target),
            ("composite.first", &self.composite.first),
            ("composite.second", &self.composite.second),
        ] {
            if symbol.is_empty() {
                return invalid(format!("{name} symbol must not be empty"));
            }
        }
        if self.composite.first == self.composite.second {
            return invalid(format!(
                "composite constituents must differ (both are {})",
                self.composite.first
            ));
        }
        if self.source == SourceKind::Csv && self.prices_path.is_none() {
            return invalid("source = csv requires prices_path (or --prices)".to_string());
        }
        Ok(())
    }

    pub fn composite_spec(&self) -> CompositeSpec {
        CompositeSpec {
            first: self.composite.first.clone(),
            second: self.composite.second.clone(),
            label: self.composite.label.clone(),
        }
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.stats.window, 30);
        assert!((settings.stats.annualization - 252.0).abs() < 1e-12);
        assert_eq!(settings.min_rows, 40);
    }

    #[test]
    fn rejects_min_rows_below_window() {
        let mut settings = Settings::default();
        settings.min_rows = 30;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_identical_constituents() {
        let mut settings = Settings::default();
        settings.composite.second = settings.composite.first.clone();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn csv_source_requires_path() {
        let mut settings = Settings::default();
        settings.source = SourceKind::Csv;
        assert!(settings.validate().is_err());
        settings.prices_path = Some(PathBuf::from("prices.csv"));
        settings.validate().unwrap();
    }
}
