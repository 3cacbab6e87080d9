//! `aix-dashboard` library crate.
//!
//! The binary (`aix`) is a thin wrapper around this library so that:
//!
//! - the statistics are testable without spawning processes or the network
//! - the report, export, and TUI front-ends share one render pipeline

pub mod analytics;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
