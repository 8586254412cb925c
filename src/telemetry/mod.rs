mod config;

pub use config::{LogFormat, TelemetryConfig};

use crate::error::{Result, YamlLsError};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Logs go to stderr: stdout carries
/// the LSP stream when serving.
pub fn init_logging() -> Result<()> {
    init_with(&TelemetryConfig::from_env())
}

pub fn init_with(config: &TelemetryConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!(
            "Invalid log filter '{}': {}. Falling back to yaml_ls=info.",
            config.filter, e
        );
        EnvFilter::new("yaml_ls=info")
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| YamlLsError::LoggingError(e.to_string()))?;

    tracing::debug!(format = ?config.format, "Tracing initialized");
    Ok(())
}
