//! Application settings: optional TOML file layered with `AIX_*` environment variables.

use std::path::Path;

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{CompositeSettings, Settings, SourceKind, YahooSettings};

/// File looked up (without extension) when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "aix";

/// Load settings from `path` (required) or `aix.toml` (optional), then apply
/// `AIX_*` environment overrides (`AIX_COMPOSITE__WEIGHT=0.7`).
///
/// The result is not validated: CLI flags may still complete it, so callers
/// run [`Settings::validate`] after the overlay.
///
/// A `.env` file in the working directory is loaded first so overrides can
/// live there.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings: Settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("AIX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    tracing::debug!(?settings, "loaded settings");
    Ok(settings)
}
