//! `tracing` subscriber setup for hosts and the replay binary.

use carbonmatch_types::{CarbonError, Result};
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Install a global subscriber writing to stderr. The filter comes from
/// `RUST_LOG`, defaulting to `info`.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| CarbonError::Configuration(format!("tracing init failed: {e}")))
}
