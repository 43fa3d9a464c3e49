//! The context handed to a running rule.

use crate::bridge::EvaluationBridge;
use crate::error::LintError;
use crate::scope::ScopeSet;
use serde_json::Value;
use std::sync::Arc;
use viewlint_driver::Page;
use viewlint_types::Violation;

/// Everything one rule invocation gets to work with: its validated options,
/// the stabilized scope, in-page evaluation, and a host-side report
/// passthrough for violations whose location is already known on this side.
pub struct RuleContext<'a> {
    rule_id: &'a str,
    options: &'a [Value],
    scope: &'a ScopeSet,
    page: Arc<dyn Page>,
    bridge: &'a EvaluationBridge,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        rule_id: &'a str,
        options: &'a [Value],
        scope: &'a ScopeSet,
        page: Arc<dyn Page>,
        bridge: &'a EvaluationBridge,
    ) -> Self {
        Self {
            rule_id,
            options,
            scope,
            page,
            bridge,
        }
    }

    /// Canonical id of the running rule.
    #[must_use]
    pub const fn rule_id(&self) -> &str {
        self.rule_id
    }

    /// Validated positional option values.
    #[must_use]
    pub const fn options(&self) -> &[Value] {
        self.options
    }

    /// Positional option value `index`, if configured.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&Value> {
        self.options.get(index)
    }

    /// The stabilized scope for the current page content generation.
    #[must_use]
    pub const fn scope(&self) -> &ScopeSet {
        self.scope
    }

    /// The page, for host-side queries (attributes, structure).
    #[must_use]
    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Run `source` inside the page with `{report, scope, args}` injected.
    pub async fn evaluate(&self, source: &str, args: Value) -> Result<Value, LintError> {
        self.bridge.evaluate(self.scope, source, args).await
    }

    /// Report a violation directly from the host side.
    pub fn report(&self, violation: Violation) -> Result<(), LintError> {
        self.bridge.report(violation)
    }
}
