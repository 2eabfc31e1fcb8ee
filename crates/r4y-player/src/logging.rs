//! Tracing setup for hosts embedding the player.

use std::path::Path;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,r4y_player=debug,hyper_util=warn,reqwest=warn,hyper=warn";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global fmt subscriber writing to stderr.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(default_filter))
        .try_init()
        .context("a global tracing subscriber is already installed")
}

/// Same as [`init`] but appends plain-text lines to `log_path`, for hosts
/// that own the terminal.
pub fn init_to_file(log_path: &Path, default_filter: &str) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(default_filter))
        .try_init()
        .context("a global tracing subscriber is already installed")?;
    tracing::info!("Log file: {:?}", log_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_second_init_is_an_error() {
        let _ = init(DEFAULT_FILTER);
        assert!(init(DEFAULT_FILTER).is_err());
    }
}
