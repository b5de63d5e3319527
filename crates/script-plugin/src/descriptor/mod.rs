//! Typed descriptor holding plugin identity and invocation settings.
//!
//! A [`PluginDescriptor`] is produced by [`crate::config::bind`] from the
//! host's string map. The identity accessors refuse to hand out blank values
//! so hosts never register a plugin under an empty name or version.

use std::time::Duration;

use crate::error::{IdentityField, PluginError};

/// Identity and invocation settings of a script plugin.
///
/// # Example
///
/// ```
/// use script_plugin::PluginDescriptor;
///
/// let descriptor = PluginDescriptor::new("greeter", "1.0.0")
///     .with_arguments(vec!["--loud".into()])
///     .with_expected_output("Hello");
///
/// assert_eq!(descriptor.name().ok(), Some("greeter"));
/// assert_eq!(descriptor.arguments(), ["--loud"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDescriptor {
    name: String,
    version: String,
    arguments: Vec<String>,
    expected_output: String,
    timeout: Option<Duration>,
}

impl PluginDescriptor {
    /// Creates a descriptor with the given identity and no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Replaces the argument list.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Replaces the expected output substring.
    #[must_use]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    /// Sets the execution timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the plugin name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyField`] when the name is empty or only
    /// whitespace.
    pub fn name(&self) -> Result<&str, PluginError> {
        non_blank(&self.name, IdentityField::Name)
    }

    /// Returns the plugin version.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyField`] when the version is empty or only
    /// whitespace.
    pub fn version(&self) -> Result<&str, PluginError> {
        non_blank(&self.version, IdentityField::Version)
    }

    /// Returns the arguments passed positionally to the script.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Returns the substring a successful output must contain.
    #[must_use]
    pub const fn expected_output(&self) -> &str {
        self.expected_output.as_str()
    }

    /// Returns the execution timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_version(&mut self, version: String) {
        self.version = version;
    }

    pub(crate) fn set_arguments(&mut self, arguments: Vec<String>) {
        self.arguments = arguments;
    }

    pub(crate) fn set_expected_output(&mut self, expected: String) {
        self.expected_output = expected;
    }

    pub(crate) const fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }
}

fn non_blank(value: &str, field: IdentityField) -> Result<&str, PluginError> {
    if value.trim().is_empty() {
        return Err(PluginError::EmptyField { field });
    }
    Ok(value)
}
