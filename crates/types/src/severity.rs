//! Resolved severity for lint messages.

use serde::{Deserialize, Serialize};

/// Severity of a lint rule after configuration resolution.
///
/// This is the at-rest severity set: the config-time-only value `inherit`
/// never survives resolution and has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule is disabled
    Off,
    /// Violations are reported as informational messages
    Info,
    /// Violations are reported as warnings
    Warn,
    /// Violations are reported as errors
    Error,
}

impl Severity {
    /// Returns true if a rule with this severity should run at all.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Returns true if this severity indicates an error.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}
