//! Script-execution plugin core.
//!
//! The `script-plugin` crate implements the lifecycle a host orchestrator
//! drives when it loads a script plugin: bind string-keyed configuration,
//! report identity, run a build-time-embedded script as a child process, and
//! classify the captured output as `success` or `failure`.
//!
//! # Architecture
//!
//! - [`config`] turns the host's `HashMap<String, String>` into a typed
//!   [`PluginDescriptor`].
//! - [`runner`] writes the [`ScriptPayload`] to a temporary executable,
//!   spawns it, and captures combined stdout and stderr.
//! - [`outcome`] compares the captured text with the expected substring.
//! - [`plugin`] ties these together behind the [`Plugin`] capability trait,
//!   guarded by the [`LifecycleState`] machine.
//! - [`protocol`] carries capability calls as JSONL over stdio.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use script_plugin::{Plugin, ScriptPayload, ScriptPlugin};
//!
//! let payload = ScriptPayload::from_static(b"#!/bin/sh\necho \"Hello, $1\"\n");
//! let mut plugin = ScriptPlugin::from_payload(payload);
//! plugin.init(&HashMap::from([
//!     (String::from("Name"), String::from("greeter")),
//!     (String::from("Version"), String::from("1.0.0")),
//!     (String::from("Arguments"), String::from("World")),
//!     (String::from("ExpectedOutput"), String::from("Hello")),
//! ])).expect("configuration binds");
//! plugin.run().expect("script runs");
//! assert!(plugin.parse_output().expect("classification").is_success());
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod outcome;
pub mod plugin;
pub mod protocol;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::descriptor::PluginDescriptor;
pub use self::error::{ErrorKind, ExecutionCause, IdentityField, IoStep, PluginError};
pub use self::lifecycle::{LifecycleState, Operation};
pub use self::outcome::Verdict;
pub use self::plugin::{Plugin, ScriptPlugin};
pub use self::protocol::{PluginCall, PluginReply};
pub use self::runner::{ScriptExecutor, ScriptPayload, ScriptRunner};
