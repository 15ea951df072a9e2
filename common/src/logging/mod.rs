//! Logging module - structured file logging for all cpe binaries.
//!
//! Uses tracing + tracing-subscriber + tracing-appender for JSON output
//! with daily rotation under the user's config directory.

use anyhow::Result;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with file-based JSON output and daily rotation.
///
/// Logs go to `<config-dir>/cpe/logs/cpe-YYYY-MM-DD`, file-only (no stdout) so
/// CLI output stays clean. `RUST_LOG` overrides the default level; `verbose`
/// forces debug regardless of environment.
pub fn init_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
        .join("cpe")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(log_dir, "cpe");

    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(file_appender))
        .with(env_filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_basic() {
        // Can only init the global subscriber once per process; a failure here
        // just means another test initialized it first.
        let _result = init_logging(false);
    }
}
