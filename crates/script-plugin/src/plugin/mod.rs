//! The capability interface and its script-backed implementation.
//!
//! Hosts bind to [`Plugin`]. [`ScriptPlugin`] composes the configuration
//! binder, descriptor, executor, and classifier behind that interface and
//! tracks call order with a [`LifecycleState`].

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config;
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use crate::lifecycle::{LifecycleState, Operation};
use crate::outcome::{Verdict, classify};
use crate::runner::{ScriptExecutor, ScriptPayload, ScriptRunner};

/// Tracing target for plugin lifecycle events.
const PLUGIN_TARGET: &str = "script_plugin::plugin";

/// Capability interface a host orchestrator drives.
///
/// Calls are expected in the order `init`, `name`/`version`, `run`,
/// `parse_output`. A single caller owns each instance; implementations do
/// no internal locking.
pub trait Plugin {
    /// Binds the host's configuration into the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] for unknown keys or values that
    /// cannot be converted.
    fn init(&mut self, config: &HashMap<String, String>) -> Result<(), PluginError>;

    /// Returns the configured plugin name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyField`] when the name is blank.
    fn name(&self) -> Result<String, PluginError>;

    /// Returns the configured plugin version.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyField`] when the version is blank.
    fn version(&self) -> Result<String, PluginError>;

    /// Executes the script and stores its combined output.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Lifecycle`] before `init`, otherwise any
    /// [`PluginError::Io`] or [`PluginError::Execution`] from the executor.
    fn run(&mut self) -> Result<(), PluginError>;

    /// Classifies the stored output against the expected substring.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` mirrors the host's calling convention.
    fn parse_output(&mut self) -> Result<Verdict, PluginError>;
}

/// A plugin that runs a fixed script and classifies its output.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use script_plugin::{Plugin, PluginError, ScriptExecutor, ScriptPlugin, Verdict};
///
/// struct Canned;
///
/// impl ScriptExecutor for Canned {
///     fn execute(
///         &self,
///         _arguments: &[String],
///         _timeout: Option<Duration>,
///     ) -> Result<String, PluginError> {
///         Ok(String::from("Hello, World!"))
///     }
/// }
///
/// let mut plugin = ScriptPlugin::new(Canned);
/// plugin.init(&HashMap::from([
///     (String::from("Name"), String::from("greeter")),
///     (String::from("ExpectedOutput"), String::from("Hello")),
/// ])).unwrap();
/// plugin.run().unwrap();
/// assert_eq!(plugin.parse_output().unwrap(), Verdict::Success);
/// ```
#[derive(Debug)]
pub struct ScriptPlugin<E = ScriptRunner> {
    descriptor: PluginDescriptor,
    output: String,
    state: LifecycleState,
    default_timeout: Option<Duration>,
    executor: E,
}

impl ScriptPlugin<ScriptRunner> {
    /// Creates a plugin that executes `payload` from a temporary file.
    #[must_use]
    pub fn from_payload(payload: ScriptPayload) -> Self {
        Self::new(ScriptRunner::new(payload))
    }
}

impl<E> ScriptPlugin<E> {
    /// Creates an uninitialised plugin backed by `executor`.
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self {
            descriptor: PluginDescriptor::default(),
            output: String::new(),
            state: LifecycleState::Uninitialized,
            default_timeout: None,
            executor,
        }
    }

    /// Sets the timeout used when the host's configuration has none.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns the bound descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Returns the output of the most recent successful run.
    #[must_use]
    pub const fn output(&self) -> &str {
        self.output.as_str()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: ScriptExecutor> Plugin for ScriptPlugin<E> {
    fn init(&mut self, config: &HashMap<String, String>) -> Result<(), PluginError> {
        let mut descriptor = config::bind(config)?;
        if descriptor.timeout().is_none() {
            descriptor.set_timeout(self.default_timeout);
        }

        info!(
            target: PLUGIN_TARGET,
            operation = %Operation::Init,
            plugin = descriptor.name().ok(),
            version = descriptor.version().ok(),
            arguments = descriptor.arguments().len(),
            timeout_secs = descriptor.timeout().map(|timeout| timeout.as_secs()),
            "plugin initialised"
        );

        self.descriptor = descriptor;
        self.output.clear();
        self.state = self.state.on_init();
        Ok(())
    }

    fn name(&self) -> Result<String, PluginError> {
        self.descriptor.name().map(str::to_owned)
    }

    fn version(&self) -> Result<String, PluginError> {
        self.descriptor.version().map(str::to_owned)
    }

    fn run(&mut self) -> Result<(), PluginError> {
        self.state.begin_run()?;

        match self
            .executor
            .execute(self.descriptor.arguments(), self.descriptor.timeout())
        {
            Ok(output) => {
                debug!(
                    target: PLUGIN_TARGET,
                    plugin = self.descriptor.name().ok(),
                    output_bytes = output.len(),
                    "script run succeeded"
                );
                self.output = output;
                self.state = self.state.on_run();
                Ok(())
            }
            Err(err) => {
                warn!(
                    target: PLUGIN_TARGET,
                    plugin = self.descriptor.name().ok(),
                    error = %err,
                    "script run failed"
                );
                self.output.clear();
                self.state = self.state.on_run_failed();
                Err(err)
            }
        }
    }

    fn parse_output(&mut self) -> Result<Verdict, PluginError> {
        if !self.state.has_output() {
            warn!(
                target: PLUGIN_TARGET,
                operation = %Operation::ParseOutput,
                state = %self.state,
                "classifying before a successful run; output is empty"
            );
        }

        let verdict = classify(&self.output, self.descriptor.expected_output());
        self.state = self.state.on_classify();
        debug!(target: PLUGIN_TARGET, %verdict, "output classified");
        Ok(verdict)
    }
}
