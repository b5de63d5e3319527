//! Structured telemetry for the plugin binary.
//!
//! The host reads plugin replies from stdout, so the subscriber installed
//! here writes only to stderr. A log line on stdout would be read as a
//! malformed reply.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::config::{LogFormat, ServeConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Marker returned once the plugin's subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors raised while installing the plugin's subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `--log-filter` did not parse as an `EnvFilter` directive.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config`.
///
/// Only the first call installs anything. Later calls, including ones with a
/// different configuration, return a handle without touching global state,
/// so a test harness and the binary can both call this safely.
///
/// # Examples
///
/// ```rust
/// use script_plugin_template::ServeConfig;
/// use script_plugin_template::telemetry;
///
/// # fn main() -> Result<(), script_plugin_template::TelemetryError> {
/// let config = ServeConfig::load_from_iter(["script-plugin-template", "--log-format", "compact"])
///     .unwrap_or_default();
/// let first = telemetry::initialise(&config)?;
/// let again = telemetry::initialise(&ServeConfig::default())?;
///
/// drop(first);
/// drop(again);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] if the filter is invalid or another
/// subscriber is already installed.
pub fn initialise(config: &ServeConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

pub(crate) fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &ServeConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config.log_filter())?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            // Stdout is reserved for protocol replies.
            .with_writer(io::stderr)
            // Hosts usually capture stderr to a file; colour only for a TTY.
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
