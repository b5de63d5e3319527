//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint and keep the error
//! `Send + Sync`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::{LifecycleState, Operation};

/// Identity field checked by the descriptor accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    /// The plugin name.
    Name,
    /// The plugin version.
    Version,
}

impl IdentityField {
    /// Returns the lowercase field name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Version => "version",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of script materialisation that touched the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStep {
    /// Creating the temporary file.
    Create,
    /// Writing the payload into the temporary file.
    Write,
    /// Marking the temporary file executable.
    Permissions,
}

impl IoStep {
    /// Returns a short description of the step.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Create => "create temporary script file",
            Self::Write => "write script payload",
            Self::Permissions => "set executable permissions on script file",
        }
    }
}

impl fmt::Display for IoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Underlying reason a script execution failed.
#[derive(Debug, Clone, Error)]
pub enum ExecutionCause {
    /// The process could not be started.
    #[error("failed to spawn script: {0}")]
    Spawn(#[source] Arc<std::io::Error>),

    /// Waiting on or reading from the process failed.
    #[error("failed to collect script result: {0}")]
    Wait(#[source] Arc<std::io::Error>),

    /// The process exited unsuccessfully.
    #[error("script exited with non-zero status {status}")]
    NonZeroExit {
        /// Exit code, `-1` when the process was terminated by a signal.
        status: i32,
    },

    /// The process outlived the configured timeout and was killed.
    #[error("script timed out after {timeout_secs}s")]
    TimedOut {
        /// Bound that elapsed, in seconds.
        timeout_secs: u64,
    },
}

/// Coarse error category reported across the capability boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Configuration could not be bound.
    Validation,
    /// A required identity field was blank.
    EmptyField,
    /// Temporary file handling failed.
    Io,
    /// The script could not be run to a successful exit.
    Execution,
    /// An operation was called out of order.
    Lifecycle,
    /// The host sent a call the plugin could not decode.
    Protocol,
}

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A configuration key was unknown or its value had the wrong type.
    #[error("invalid configuration for '{key}': {message}")]
    Validation {
        /// Key that failed to bind.
        key: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A required identity field was empty or blank.
    #[error("script {field} is empty")]
    EmptyField {
        /// Field that was blank.
        field: IdentityField,
    },

    /// A filesystem step while materialising the script failed.
    #[error("failed to {step}: {source}")]
    Io {
        /// Step that failed.
        step: IoStep,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The script did not run to a successful exit.
    #[error("error executing script: {cause}")]
    Execution {
        /// Why execution failed.
        #[source]
        cause: ExecutionCause,
        /// Combined output captured before the failure.
        output: String,
    },

    /// An operation was invoked from a state that does not permit it.
    #[error("cannot {operation} while plugin is {state}")]
    Lifecycle {
        /// Rejected operation.
        operation: Operation,
        /// State the plugin was in.
        state: LifecycleState,
    },
}

impl PluginError {
    /// Builds a validation error for `key`.
    pub(crate) fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Builds an I/O error for the given materialisation step.
    pub(crate) fn io(step: IoStep, source: std::io::Error) -> Self {
        Self::Io {
            step,
            source: Arc::new(source),
        }
    }

    /// Builds an execution error carrying any captured output.
    pub(crate) const fn execution(cause: ExecutionCause, output: String) -> Self {
        Self::Execution { cause, output }
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::EmptyField { .. } => ErrorKind::EmptyField,
            Self::Io { .. } => ErrorKind::Io,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::Lifecycle { .. } => ErrorKind::Lifecycle,
        }
    }
}
