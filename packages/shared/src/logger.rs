//! Logging setup utilities for the Cups binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Sets up logging for the calling crate, the client library and the binary.
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `crate_name` - The calling crate, usually `env!("CARGO_PKG_NAME")`
/// * `binary_name` - The name of the binary (e.g., "cups-client")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use cups_shared::logger::setup_logger;
///
/// setup_logger(env!("CARGO_PKG_NAME"), "cups-client", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_level: &str) {
    let filter = default_filter(crate_name, binary_name, default_level);

    // try_init: tests and embedders may already have installed a subscriber
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Logger already initialized: {}", e);
    }
}

/// Build the filter directive used when `RUST_LOG` is not set.
fn default_filter(crate_name: &str, binary_name: &str, default_level: &str) -> String {
    format!(
        "{}={},{}={}",
        crate_name.replace('-', "_"),
        default_level,
        binary_name.replace('-', "_"),
        default_level
    )
}
