//! Line-delimited JSON messages carrying capability calls over stdio.
//!
//! The host writes one [`PluginCall`] per line to the plugin's stdin and
//! reads one [`PluginReply`] per line from its stdout. Each call maps onto a
//! method of [`Plugin`]; [`dispatch`] performs that mapping. Logs go to
//! stderr and are not part of the protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PluginError};
use crate::plugin::Plugin;

/// Call sent from the host to the plugin.
///
/// # Example
///
/// ```
/// use script_plugin::protocol::PluginCall;
///
/// let call: PluginCall = serde_json::from_str(r#"{"method":"run"}"#).unwrap();
/// assert_eq!(call, PluginCall::Run);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PluginCall {
    /// Bind configuration.
    Init {
        /// String-keyed configuration map.
        #[serde(default)]
        config: HashMap<String, String>,
    },
    /// Report the plugin name.
    Name,
    /// Report the plugin version.
    Version,
    /// Execute the script.
    Run,
    /// Classify the captured output.
    ParseOutput,
}

/// Error details carried in a failed [`PluginReply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    kind: ErrorKind,
    message: String,
}

impl ReplyError {
    /// Creates an error payload.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl From<&PluginError> for ReplyError {
    fn from(err: &PluginError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// Reply sent from the plugin to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PluginReply {
    /// The call succeeded. `value` is absent for calls with no result.
    Ok {
        /// Result of the call.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// The call failed.
    Error {
        /// Failure details.
        error: ReplyError,
    },
}

impl PluginReply {
    /// Creates a successful reply carrying `value`.
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Ok {
            value: Some(value.into()),
        }
    }

    /// Creates a successful reply with no value.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Ok { value: None }
    }

    /// Creates a failed reply.
    #[must_use]
    pub const fn failure(error: ReplyError) -> Self {
        Self::Error { error }
    }

    /// Returns `true` if the call succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Returns the carried value, if any.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        match self {
            Self::Ok { value } => value.as_deref(),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error payload, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ReplyError> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { error } => Some(error),
        }
    }
}

impl From<Result<Option<String>, PluginError>> for PluginReply {
    fn from(result: Result<Option<String>, PluginError>) -> Self {
        match result {
            Ok(value) => Self::Ok { value },
            Err(err) => Self::failure(ReplyError::from(&err)),
        }
    }
}

/// Applies `call` to `plugin` and converts the outcome into a reply.
pub fn dispatch<P: Plugin + ?Sized>(plugin: &mut P, call: &PluginCall) -> PluginReply {
    let result = match call {
        PluginCall::Init { config } => plugin.init(config).map(|()| None),
        PluginCall::Name => plugin.name().map(Some),
        PluginCall::Version => plugin.version().map(Some),
        PluginCall::Run => plugin.run().map(|()| None),
        PluginCall::ParseOutput => plugin
            .parse_output()
            .map(|verdict| Some(verdict.as_str().to_owned())),
    };
    PluginReply::from(result)
}
