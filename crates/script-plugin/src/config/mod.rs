//! Binding of the host's string-keyed configuration into a descriptor.
//!
//! Hosts pass configuration as a flat map of field name to string value.
//! [`bind`] walks the map once, matches every key against the fields the
//! descriptor declares, and converts each value to the field's type.
//! Unknown keys and unconvertible values are rejected with
//! [`PluginError::Validation`].

use std::collections::HashMap;
use std::time::Duration;

use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;

/// Key carrying the plugin name.
pub const NAME_KEY: &str = "Name";
/// Key carrying the plugin version.
pub const VERSION_KEY: &str = "Version";
/// Key carrying the comma-separated argument list.
pub const ARGUMENTS_KEY: &str = "Arguments";
/// Key carrying the substring a successful output must contain.
pub const EXPECTED_OUTPUT_KEY: &str = "ExpectedOutput";
/// Key carrying the execution timeout in whole seconds.
pub const TIMEOUT_SECS_KEY: &str = "TimeoutSecs";

/// Keys accepted by [`bind`].
pub const RECOGNISED_KEYS: [&str; 5] = [
    NAME_KEY,
    VERSION_KEY,
    ARGUMENTS_KEY,
    EXPECTED_OUTPUT_KEY,
    TIMEOUT_SECS_KEY,
];

/// Builds a descriptor from the host's configuration map.
///
/// Keys absent from the map leave the corresponding field at its default.
///
/// # Errors
///
/// Returns [`PluginError::Validation`] if the map contains a key the
/// descriptor does not declare, or if `TimeoutSecs` is not a positive
/// integer.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use script_plugin::config::bind;
///
/// let config = HashMap::from([
///     (String::from("Name"), String::from("greeter")),
///     (String::from("Arguments"), String::from("a, b ,c")),
/// ]);
/// let descriptor = bind(&config).unwrap();
/// assert_eq!(descriptor.arguments(), ["a", "b", "c"]);
/// ```
pub fn bind<S: std::hash::BuildHasher>(
    config: &HashMap<String, String, S>,
) -> Result<PluginDescriptor, PluginError> {
    let mut descriptor = PluginDescriptor::default();
    for (key, value) in config {
        bind_field(&mut descriptor, key, value)?;
    }
    Ok(descriptor)
}

fn bind_field(
    descriptor: &mut PluginDescriptor,
    key: &str,
    value: &str,
) -> Result<(), PluginError> {
    match key {
        NAME_KEY => descriptor.set_name(value.to_owned()),
        VERSION_KEY => descriptor.set_version(value.to_owned()),
        ARGUMENTS_KEY => descriptor.set_arguments(split_arguments(value)),
        EXPECTED_OUTPUT_KEY => descriptor.set_expected_output(value.to_owned()),
        TIMEOUT_SECS_KEY => descriptor.set_timeout(Some(parse_timeout(key, value)?)),
        unknown => {
            return Err(PluginError::validation(
                unknown,
                format!(
                    "cannot set field {unknown}; expected one of {}",
                    RECOGNISED_KEYS.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

/// Splits a comma-separated list, trimming each element.
///
/// An empty input yields a single empty element.
#[must_use]
pub fn split_arguments(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|element| element.trim().to_owned())
        .collect()
}

fn parse_timeout(key: &str, value: &str) -> Result<Duration, PluginError> {
    let seconds = value.trim().parse::<u64>().map_err(|error| {
        PluginError::validation(key, format!("expected whole seconds, got '{value}': {error}"))
    })?;
    if seconds == 0 {
        return Err(PluginError::validation(key, "timeout must be greater than zero"));
    }
    Ok(Duration::from_secs(seconds))
}
