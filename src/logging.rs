//! Structured logging setup.
//!
//! All logs go to **stderr**: stdout carries the handshake line the host
//! reads to find the gRPC address.
//!
//! `RUST_LOG` controls filtering, e.g. `RUST_LOG=azurerm_provider=debug`
//! to see every ARM request and poll.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with a different default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Install the global subscriber if none is set yet.
///
/// Returns `false` when a subscriber was already installed, which is the
/// normal case in tests that share a process.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("azurerm_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,azurerm_provider::client=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
