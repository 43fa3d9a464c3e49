//! Engine error types.

use crate::traits::BoxError;
use thiserror::Error;
use viewlint_driver::DriverError;

/// Errors raised eagerly while resolving configuration fragments.
///
/// None of these are deferred to run time: a configuration that resolves
/// cleanly never produces them afterwards.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A `namespace/name` reference named a plugin nobody registered.
    #[error("unknown plugin namespace '{namespace}'; known namespaces: {}", format_list(.known))]
    UnknownPlugin {
        namespace: String,
        known: Vec<String>,
    },

    /// An extends reference did not match any plugin config.
    #[error("unknown config '{reference}'; known configs: {}", format_list(.candidates))]
    UnknownConfig {
        reference: String,
        candidates: Vec<String>,
    },

    /// A bare extends reference matched configs in several namespaces.
    #[error("ambiguous config '{reference}'; matches: {}", format_list(.candidates))]
    AmbiguousConfig {
        reference: String,
        candidates: Vec<String>,
    },

    /// A rule setting named a rule nobody registered.
    #[error("unknown rule '{reference}'; known rules: {}", format_list(.candidates))]
    UnknownRule {
        reference: String,
        candidates: Vec<String>,
    },

    /// A bare rule reference matched rules in several namespaces.
    #[error("ambiguous rule '{reference}'; matches: {}", format_list(.candidates))]
    AmbiguousRule {
        reference: String,
        candidates: Vec<String>,
    },

    /// The extends graph revisited a reference or fragment mid-expansion.
    #[error("circular extends chain: {}", .chain.join(" -> "))]
    CircularExtends { chain: Vec<String> },

    /// Two different plugins were registered under one namespace.
    #[error("plugin namespace '{namespace}' is already registered with a different plugin")]
    PluginConflict { namespace: String },

    /// More positional option values than the rule's schema has slots.
    #[error("rule '{rule}' accepts {slots} option value(s), got {given}")]
    TooManyOptions {
        rule: String,
        given: usize,
        slots: usize,
    },

    /// Option values supplied to a rule that declares no schema.
    #[error("rule '{rule}' does not accept options")]
    OptionsNotAccepted { rule: String },

    /// An option value failed schema validation.
    #[error("invalid options for rule '{rule}': {detail}")]
    InvalidOptions { rule: String, detail: String },

    /// The rule's own schema is not a valid schema.
    #[error("invalid option schema declared by rule '{rule}': {detail}")]
    InvalidSchema { rule: String, detail: String },
}

/// Errors raised while linting targets.
#[derive(Debug, Error)]
pub enum LintError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A scope spec resolved to zero elements.
    #[error("scope resolution failed: {0}")]
    ScopeResolution(String),

    /// The host/page evaluation protocol was violated. Always an internal
    /// invariant defect, never user error.
    #[error("evaluation protocol violated: {0}")]
    EvaluationProtocol(String),

    /// A rule's own logic failed. Aborts the current target's remaining
    /// rules; sibling targets are unaffected.
    #[error("rule '{rule_id}' failed: {source}")]
    RuleExecution {
        rule_id: String,
        #[source]
        source: BoxError,
    },

    /// A target referenced a view missing from the registry.
    #[error("unknown view '{name}'; known views: {}", format_list(.known))]
    UnknownView { name: String, known: Vec<String> },

    /// A target referenced an option layer missing from the registry.
    #[error("unknown option layer '{name}'; known layers: {}", format_list(.known))]
    UnknownOptionLayer { name: String, known: Vec<String> },

    /// A target referenced a named scope missing from the registry.
    #[error("unknown scope '{name}'; known scopes: {}", format_list(.known))]
    UnknownScope { name: String, known: Vec<String> },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Sorted, comma-separated candidate list for error messages.
fn format_list(names: &[String]) -> String {
    if names.is_empty() {
        return "(none)".to_string();
    }
    names.join(", ")
}
