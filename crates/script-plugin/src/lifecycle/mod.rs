//! Call-order state machine for a plugin instance.
//!
//! The host drives a plugin through `init`, `run`, and `parse_output` in
//! that order. [`LifecycleState`] records how far an instance has progressed
//! and decides which transitions are permitted. Identity accessors are not
//! modelled here because they never change state.

use std::fmt;

use crate::error::PluginError;

/// Progress of a plugin instance through its call chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// No configuration has been bound yet.
    #[default]
    Uninitialized,
    /// Configuration is bound; the script has not run.
    Initialized,
    /// The script completed successfully at least once.
    Ran,
    /// The latest output has been classified.
    Classified,
}

impl LifecycleState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Ran => "ran",
            Self::Classified => "classified",
        }
    }

    /// Returns `true` once a run has produced output to classify.
    #[must_use]
    pub const fn has_output(self) -> bool {
        matches!(self, Self::Ran | Self::Classified)
    }

    /// State after binding configuration. Always permitted.
    #[must_use]
    pub const fn on_init(self) -> Self {
        Self::Initialized
    }

    /// Checks that a run may start from this state.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Lifecycle`] when the plugin has not been
    /// initialised.
    pub const fn begin_run(self) -> Result<(), PluginError> {
        match self {
            Self::Uninitialized => Err(PluginError::Lifecycle {
                operation: Operation::Run,
                state: self,
            }),
            Self::Initialized | Self::Ran | Self::Classified => Ok(()),
        }
    }

    /// State after a successful run.
    #[must_use]
    pub const fn on_run(self) -> Self {
        Self::Ran
    }

    /// State after a failed run, which discards any stored output.
    #[must_use]
    pub const fn on_run_failed(self) -> Self {
        Self::Initialized
    }

    /// State after classification. Classification before any run leaves
    /// the state untouched.
    #[must_use]
    pub const fn on_classify(self) -> Self {
        if self.has_output() {
            Self::Classified
        } else {
            self
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability operation named in lifecycle errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Configuration binding.
    Init,
    /// Script execution.
    Run,
    /// Output classification.
    ParseOutput,
}

impl Operation {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Run => "run",
            Self::ParseOutput => "parse_output",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
