//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads and overlays settings
//! - installs logging
//! - renders the dashboard once (report/export) or interactively (tui)

use std::fs::create_dir_all;

use clap::Parser;

use crate::cli::{Command, DashboardArgs, ExportArgs, ReportArgs};
use crate::config::Settings;
use crate::error::AppError;
use crate::logging::LogTarget;

pub mod pipeline;

use pipeline::Dashboard;

/// Entry point for the `aix` binary.
pub fn run() -> Result<(), AppError> {
    // `aix` and `aix -s 3y` behave like `aix tui ...`. Clap requires a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let target = match cli.command {
        Command::Tui(_) => LogTarget::File,
        Command::Report(_) | Command::Export(_) => LogTarget::Stderr,
    };
    let _log_guard = crate::logging::init(target)?;

    match cli.command {
        Command::Tui(args) => handle_tui(&args),
        Command::Report(args) => handle_report(&args),
        Command::Export(args) => handle_export(&args),
    }
}

/// Settings file + environment, overlaid with the given flags.
pub fn load_settings(args: &DashboardArgs) -> Result<Settings, AppError> {
    let mut settings = crate::config::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn handle_tui(args: &DashboardArgs) -> Result<(), AppError> {
    let settings = load_settings(args)?;
    crate::tui::run(&settings)
}

fn handle_report(args: &ReportArgs) -> Result<(), AppError> {
    let settings = load_settings(&args.dashboard)?;
    let mut dashboard = Dashboard::from_settings(&settings)?;
    let view = dashboard.render(&crate::cli::initial_controls(&settings))?;

    println!("{}", crate::report::format_dashboard(&view));

    if !args.no_plot {
        let charts = &view.charts;
        for chart in [&charts.performance, &charts.volatility, &charts.drawdown, &charts.correlation] {
            println!("{}", crate::plot::render_time_chart(chart, args.width, args.height));
        }
        println!("{}", crate::plot::render_scatter(&charts.scatter, args.width, args.height));
    }
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<(), AppError> {
    let settings = load_settings(&args.dashboard)?;
    let mut dashboard = Dashboard::from_settings(&settings)?;
    let view = dashboard.render(&crate::cli::initial_controls(&settings))?;

    create_dir_all(&args.out_dir).map_err(|e| {
        AppError::new(
            4,
            format!("Failed to create output dir '{}': {e}", args.out_dir.display()),
        )
    })?;

    let series = args.out_dir.join("series.csv");
    let summary = args.out_dir.join("summary.json");
    crate::io::write_series_csv(&series, &view)?;
    crate::io::write_summary_json(&summary, &view)?;

    println!("{}", crate::report::format_kpis(&view.kpis));
    println!("Wrote {}", series.display());
    println!("Wrote {}", summary.display());
    Ok(())
}

/// Rewrite argv so `aix` defaults to `aix tui`.
///
/// Rules:
/// - `aix`                      -> `aix tui`
/// - `aix -s 3y ...`            -> `aix tui -s 3y ...`
/// - `aix --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if matches!(arg1.as_str(), "tui" | "report" | "export") {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_launches_tui() {
        assert_eq!(rewrite_args(argv(&["aix"])), argv(&["aix", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["aix", "-s", "3y"])),
            argv(&["aix", "tui", "-s", "3y"])
        );
    }

    #[test]
    fn prices_flag_completes_a_csv_settings_file() {
        let path = std::env::temp_dir().join(format!("aix_app_csv_{}.toml", std::process::id()));
        std::fs::write(&path, "source = \"csv\"\n").unwrap();

        let bare = DashboardArgs {
            config: Some(path.clone()),
            ..DashboardArgs::default()
        };
        let err = load_settings(&bare).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let with_prices = DashboardArgs {
            prices: Some("prices.csv".into()),
            ..bare
        };
        let settings = load_settings(&with_prices).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.source, crate::config::SourceKind::Csv);
        assert_eq!(settings.prices_path.as_deref(), Some(std::path::Path::new("prices.csv")));
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["aix", "report"])), argv(&["aix", "report"]));
        assert_eq!(rewrite_args(argv(&["aix", "--help"])), argv(&["aix", "--help"]));
    }
}
