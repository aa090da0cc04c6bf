//! Tracing subscriber setup.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`.
pub fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e).context("failed to install the tracing subscriber"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reject_invalid_filter() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_tracing("docgate=notalevel").is_err());
        }
    }
}
