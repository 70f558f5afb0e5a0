//! Diagnostic output setup.
//!
//! Drivers only emit `tracing` events; nothing is printed unless the host
//! installs a subscriber. [`init`] installs the usual one: `RUST_LOG` wins,
//! otherwise `default_level` (e.g. from [`crate::config::Settings::log_level`]).

use tracing_subscriber::EnvFilter;

/// Output format of [`init_with`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Install a human-readable subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_level: &str) -> bool {
    init_with(default_level, LogFormat::Text)
}

/// Install a subscriber writing `format`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(default_level: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
