//! Tracing setup for hosts embedding the engine.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! host's call. [`init_tracing`] is a convenience for hosts without one.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "sharemap=info";

/// Error installing the global subscriber.
#[derive(Debug, thiserror::Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`, falling back
/// to `default_directive`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // The first call may already have happened in another test thread.
        let _ = init_tracing(DEFAULT_DIRECTIVE);
        assert!(init_tracing(DEFAULT_DIRECTIVE).is_err());
    }
}
