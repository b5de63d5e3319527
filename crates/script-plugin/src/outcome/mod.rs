//! Classification of captured script output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal reported when the output contains the expected substring.
pub const SUCCESS: &str = "success";
/// Literal reported when it does not.
pub const FAILURE: &str = "failure";

/// Result of comparing script output against the expected substring.
///
/// # Example
///
/// ```
/// use script_plugin::outcome::{Verdict, classify};
///
/// assert_eq!(classify("Hello, World!", "Hello"), Verdict::Success);
/// assert_eq!(classify("Goodbye, World!", "Hello").as_str(), "failure");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The expected substring was found.
    Success,
    /// The expected substring was absent.
    Failure,
}

impl Verdict {
    /// Returns the literal reported to the host.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => SUCCESS,
            Self::Failure => FAILURE,
        }
    }

    /// Returns `true` for [`Verdict::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies `output` by case-sensitive substring containment.
///
/// No trimming is applied. An empty `expected` matches any output,
/// including an empty one.
#[must_use]
pub fn classify(output: &str, expected: &str) -> Verdict {
    if output.contains(expected) {
        Verdict::Success
    } else {
        Verdict::Failure
    }
}
