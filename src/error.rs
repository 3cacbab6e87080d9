use thiserror::Error;

use crate::domain::Symbol;

/// Process-level error: a message plus the exit code the binary returns.
///
/// Exit codes: 2 = usage/config, 3 = no usable data, 4 = runtime (I/O, terminal).
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Conditions that halt a render pass. No partial dashboard is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("No price data returned ({0}). Check your internet connection, tickers, or try another period.")]
    NoData(String),

    #[error("Missing tickers in returned data: {}. Try again or change the benchmark.", join_symbols(.0))]
    MissingSymbols(Vec<Symbol>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Per-statistic degeneracies. These never halt a render; they are shown as
/// an explicit placeholder instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatError {
    #[error("regression undefined: composite returns have zero variance")]
    DegenerateRegression,

    #[error("statistic unavailable: fewer than {window} observations")]
    UnavailableStatistic { window: usize },
}

/// Failures of a price-fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {symbol} failed: {source}")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {symbol} failed with status {status}")]
    Status { symbol: String, status: u16 },

    #[error("provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("failed to read price file '{path}': {message}")]
    File { path: String, message: String },

    #[error("invalid price data: {0}")]
    Invalid(String),
}

fn join_symbols(symbols: &[Symbol]) -> String {
    let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
    format!("[{}]", names.join(", "))
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let code = match err {
            PipelineError::InvalidInput(_) => 2,
            PipelineError::NoData(_) | PipelineError::MissingSymbols(_) => 3,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::new(2, err.to_string())
    }
}
