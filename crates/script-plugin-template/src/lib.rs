//! Script plugin entrypoint and embedded payload.
//!
//! This crate packages `scripts/run.sh` into a plugin binary. The binary
//! reads capability calls as JSONL from stdin, drives a
//! [`ScriptPlugin`](script_plugin::ScriptPlugin) through them, and writes one
//! reply per call to stdout. Logs go to stderr.
//!
//! To adapt the template, replace `scripts/run.sh`; the payload is embedded
//! at build time and executed unmodified on every `run` call.

pub mod config;
pub mod serve;
pub mod telemetry;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::info;

use script_plugin::{ScriptPayload, ScriptPlugin};

pub use self::config::{LogFormat, ServeConfig};
pub use self::serve::{ServeError, serve};
pub use self::telemetry::TelemetryError;

/// Tracing target for process lifecycle events.
const MAIN_TARGET: &str = "script_plugin_template";

/// Script bytes embedded at build time.
pub const EMBEDDED_SCRIPT: &[u8] = include_bytes!("../scripts/run.sh");

/// Returns the embedded script as a runnable payload.
#[must_use]
pub fn embedded_payload() -> ScriptPayload {
    ScriptPayload::from_static(EMBEDDED_SCRIPT)
}

/// Errors that terminate the plugin process.
#[derive(Debug, Error)]
pub enum RunError {
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The stdio loop stopped on an I/O failure.
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Initialises telemetry and serves the embedded plugin until `input`
/// closes.
///
/// # Errors
///
/// Returns [`RunError`] if telemetry cannot be installed or the stdio loop
/// fails.
pub fn run(
    config: &ServeConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), RunError> {
    telemetry::initialise(config).map_err(|source| RunError::Telemetry { source })?;

    let mut plugin =
        ScriptPlugin::from_payload(embedded_payload()).with_default_timeout(config.timeout());
    info!(
        target: MAIN_TARGET,
        payload_bytes = EMBEDDED_SCRIPT.len(),
        default_timeout_secs = config.timeout().map(|timeout| timeout.as_secs()),
        "serving script plugin"
    );

    let replies = serve(input, output, &mut plugin)?;
    info!(target: MAIN_TARGET, replies, "plugin session finished");
    Ok(())
}
