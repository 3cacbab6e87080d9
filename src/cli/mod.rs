//! Command-line parsing for the AI-exposure dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the statistics code. Every flag is optional: unset flags fall
//! back to the loaded settings (`aix.toml`, `AIX_*` env vars, built-in defaults).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Settings, SourceKind};
use crate::domain::{Benchmark, CompositeWeight, Controls, Span, Symbol};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "aix",
    version,
    about = "Market sensitivity & risk dashboard: a target stock vs a weighted AI composite"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive terminal dashboard (default).
    Tui(DashboardArgs),
    /// Render once and print KPIs, regression, and ASCII charts.
    Report(ReportArgs),
    /// Render once and write `series.csv` + `summary.json`.
    Export(ExportArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct DashboardArgs {
    /// Settings file (TOML). Defaults to `./aix.toml` when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Look-back window.
    #[arg(short = 's', long, value_enum)]
    pub span: Option<Span>,

    /// Benchmark index.
    #[arg(short = 'b', long, value_enum)]
    pub benchmark: Option<Benchmark>,

    /// Share of the first composite constituent, in [0, 1] (snapped to 0.05).
    #[arg(short = 'w', long)]
    pub weight: Option<CompositeWeight>,

    /// Target symbol.
    #[arg(long)]
    pub target: Option<Symbol>,

    /// First composite constituent.
    #[arg(long)]
    pub first: Option<Symbol>,

    /// Second composite constituent.
    #[arg(long)]
    pub second: Option<Symbol>,

    /// Price source.
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Price CSV for `--source csv` (implies it when given alone).
    #[arg(long, value_name = "CSV")]
    pub prices: Option<PathBuf>,

    /// Seed for `--source synthetic`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Rolling window length (rows).
    #[arg(long)]
    pub window: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub dashboard: DashboardArgs,

    /// Skip the ASCII charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub dashboard: DashboardArgs,

    /// Output directory (created if missing).
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out_dir: PathBuf,
}

impl DashboardArgs {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(span) = self.span {
            settings.span = span;
        }
        if let Some(benchmark) = self.benchmark {
            settings.benchmark = benchmark;
        }
        if let Some(weight) = self.weight {
            settings.composite.weight = weight;
        }
        if let Some(target) = &self.target {
            settings.target = target.clone();
        }
        if let Some(first) = &self.first {
            settings.composite.first = first.clone();
        }
        if let Some(second) = &self.second {
            settings.composite.second = second.clone();
        }
        if let Some(path) = &self.prices {
            settings.prices_path = Some(path.clone());
            if self.source.is_none() {
                settings.source = SourceKind::Csv;
            }
        }
        if let Some(source) = self.source {
            settings.source = source;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(window) = self.window {
            settings.stats.window = window;
            // Keep the row floor consistent with a wider window.
            settings.min_rows = settings.min_rows.max(window.saturating_add(10));
        }
    }
}

/// Initial controls implied by the settings.
pub fn initial_controls(settings: &Settings) -> Controls {
    Controls {
        span: settings.span,
        benchmark: settings.benchmark,
        weight: settings.composite.weight,
        refresh: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "aix", "report", "--span", "3y", "--benchmark", "sp500", "--weight", "0.72", "--target", "ARKK",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };

        let mut settings = Settings::default();
        args.dashboard.apply(&mut settings);
        assert_eq!(settings.span, Span::ThreeYears);
        assert_eq!(settings.benchmark, Benchmark::Sp500);
        assert!((settings.composite.weight.first() - 0.7).abs() < 1e-12);
        assert_eq!(settings.target.as_str(), "ARKK");
        assert_eq!(settings.composite.first.as_str(), "NVDA");
    }

    #[test]
    fn prices_flag_implies_csv_source() {
        let cli = Cli::parse_from(["aix", "export", "--prices", "p.csv"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        let mut settings = Settings::default();
        args.dashboard.apply(&mut settings);
        assert_eq!(settings.source, SourceKind::Csv);
        assert_eq!(args.out_dir, PathBuf::from("out"));
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        assert!(Cli::try_parse_from(["aix", "tui", "--weight", "1.2"]).is_err());
    }

    #[test]
    fn wider_window_raises_row_floor() {
        let mut settings = Settings::default();
        DashboardArgs {
            window: Some(60),
            ..DashboardArgs::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.stats.window, 60);
        assert_eq!(settings.min_rows, 70);
        settings.validate().unwrap();
    }

    #[test]
    fn huge_window_saturates_row_floor() {
        let mut settings = Settings::default();
        DashboardArgs {
            window: Some(usize::MAX),
            ..DashboardArgs::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.min_rows, usize::MAX);
        settings.validate().unwrap();
    }
}
