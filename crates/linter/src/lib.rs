//! Linting engine for rendered pages.
//!
//! viewlint loads a page through a pluggable automation capability, runs a
//! configurable set of rules against the live DOM, and reports defects with
//! precise element locations. This crate is the engine: configuration
//! resolution into a canonical rule/plugin registry, scope stabilization
//! across the host/page boundary, the evaluation bridge that runs rule logic
//! inside the page, suppression, and the per-target orchestrator.

mod bridge;
mod config;
mod context;
mod error;
mod linter;
mod merge;
mod registry;
mod rules;
mod scope;
mod suppress;
mod traits;

pub use bridge::{element_arg, EvaluationBridge, REPORT_BINDING};
pub use config::{
    resolve, ConfigFragment, ConfigObject, ConfiguredSeverity, Extend, ResolvedConfiguration,
    RuleConfig, RuleSetting,
};
pub use context::RuleContext;
pub use error::{ConfigurationError, LintError};
pub use linter::{Linter, OptionLayer, Target, TargetKind};
pub use merge::{deep_merge, merge_layers};
pub use registry::{builtin_fragment, builtin_plugin, resolve_with_builtins, BUILTIN_NAMESPACE};
pub use rules::{DuplicateIdRule, ImageAltRule};
pub use scope::{ScopeDef, ScopeRoot, ScopeSet, ScopeSpec, ScopeStabilizer, SCOPE_MARKER_ATTR};
pub use suppress::SUPPRESS_ATTR;
pub use traits::{BoxError, OptionsSchema, Plugin, Rule, RuleMeta};

/// Prelude module for convenient imports.
///
/// Import with:
///
/// ```rust,ignore
/// use viewlint_linter::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigFragment, ConfigObject, ResolvedConfiguration, RuleSetting};
    pub use crate::context::RuleContext;
    pub use crate::error::{ConfigurationError, LintError};
    pub use crate::linter::{Linter, Target};
    pub use crate::traits::{BoxError, Plugin, Rule, RuleMeta};
    pub use viewlint_types::{LintMessage, LintResult, Severity, Violation};
}
