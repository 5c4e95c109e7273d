//! Tracing subscriber installation for the `folio` binary.

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// Install a global fmt subscriber writing to stderr.
///
/// The level defaults to `info` (`debug` when `verbose`); `RUST_LOG`
/// directives take precedence.
pub fn init(verbose: bool) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TelemetryError(err.to_string()))
}

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}
