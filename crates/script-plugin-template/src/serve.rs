//! Stdio loop that carries capability calls to the plugin.
//!
//! Each input line holds one [`PluginCall`]; each call produces exactly one
//! [`PluginReply`] line on the output. Lines that fail to decode are answered
//! with a `protocol` error so the host can correlate replies one-to-one.

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

use script_plugin::protocol::{ReplyError, dispatch};
use script_plugin::{ErrorKind, Plugin, PluginCall, PluginReply};

/// Tracing target for the stdio loop.
const SERVE_TARGET: &str = "script_plugin_template::serve";

/// Errors that stop the stdio loop.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Reading a call from stdin failed.
    #[error("failed to read plugin call: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing a reply to stdout failed.
    #[error("failed to write plugin reply: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serialising a reply failed.
    #[error("failed to serialise plugin reply: {source}")]
    Serialize {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// Answers calls from `input` until EOF, returning the number of replies
/// written.
///
/// Blank lines are ignored.
///
/// # Errors
///
/// Returns [`ServeError`] if stdin cannot be read or a reply cannot be
/// written.
pub fn serve<P: Plugin + ?Sized>(
    input: &mut impl BufRead,
    output: &mut impl Write,
    plugin: &mut P,
) -> Result<usize, ServeError> {
    let mut replies = 0;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = input
            .read_line(&mut line)
            .map_err(|source| ServeError::Read { source })?;
        if bytes_read == 0 {
            break;
        }

        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }

        let reply = answer(plugin, payload);
        write_reply(output, &reply)?;
        replies += 1;
    }
    debug!(target: SERVE_TARGET, replies, "input closed");
    Ok(replies)
}

fn answer<P: Plugin + ?Sized>(plugin: &mut P, payload: &str) -> PluginReply {
    match serde_json::from_str::<PluginCall>(payload) {
        Ok(call) => {
            debug!(target: SERVE_TARGET, ?call, "dispatching plugin call");
            let reply = dispatch(plugin, &call);
            if let Some(error) = reply.error() {
                warn!(
                    target: SERVE_TARGET,
                    kind = ?error.kind(),
                    message = error.message(),
                    "plugin call failed"
                );
            }
            reply
        }
        Err(error) => {
            warn!(target: SERVE_TARGET, %error, "undecodable plugin call");
            PluginReply::failure(ReplyError::new(
                ErrorKind::Protocol,
                format!("invalid plugin call: {error}"),
            ))
        }
    }
}

fn write_reply(output: &mut impl Write, reply: &PluginReply) -> Result<(), ServeError> {
    let payload =
        serde_json::to_string(reply).map_err(|source| ServeError::Serialize { source })?;
    output
        .write_all(payload.as_bytes())
        .map_err(|source| ServeError::Write { source })?;
    output
        .write_all(b"\n")
        .map_err(|source| ServeError::Write { source })?;
    output
        .flush()
        .map_err(|source| ServeError::Write { source })
}
