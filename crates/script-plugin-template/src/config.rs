//! Process-level configuration for the plugin binary.
//!
//! These settings govern how the binary serves the plugin, not what the
//! plugin does: the host still configures the plugin itself through the
//! `init` call. Each flag falls back to an environment variable so hosts
//! that cannot pass arguments can still tune logging.

use std::time::Duration;

use clap::Parser;
use strum::{Display, EnumString};

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Settings for serving the plugin over stdio.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "script-plugin-template",
    version,
    about = "Serves the embedded script plugin over line-delimited JSON on stdio"
)]
pub struct ServeConfig {
    /// Tracing filter directive for logs written to stderr.
    #[arg(long, env = "SCRIPT_PLUGIN_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format.
    #[arg(long, env = "SCRIPT_PLUGIN_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Timeout in seconds applied when the host does not set `TimeoutSecs`.
    #[arg(
        long,
        env = "SCRIPT_PLUGIN_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: Option<u64>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            timeout_secs: None,
        }
    }
}

impl ServeConfig {
    /// Parses configuration from an argument iterator, consulting the
    /// environment for flags that are absent.
    ///
    /// # Errors
    ///
    /// Returns a [`clap::Error`] for unknown flags or invalid values.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Returns the log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the fallback execution timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
