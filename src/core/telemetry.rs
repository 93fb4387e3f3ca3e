//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::core::config::{LogFormat, LoggingConfig};
use crate::core::errors::{QualgateError, Result};

/// Install the global tracing subscriber.
///
/// Logs go to stderr. `RUST_LOG` wins over the configured level and
/// `verbose` forces `debug`.
/// Calling this twice returns an error instead of panicking.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let directive = if verbose { "debug" } else { config.level.as_str() };
    let filter = build_filter(directive)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| QualgateError::internal(format!("Failed to install tracing subscriber: {e}")))
}

fn build_filter(directive: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|e| {
        QualgateError::validation_field(
            format!("Invalid log filter '{directive}': {e}"),
            "logging.level",
        )
    })
}
