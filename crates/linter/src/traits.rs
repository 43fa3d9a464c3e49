//! The rule and plugin contracts.

use crate::config::ConfigObject;
use crate::context::RuleContext;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use viewlint_types::Severity;

/// Boxed error returned by rule logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema for a rule's positional option values: one schema, or a positional
/// tuple of schemas. Schemas are JSON Schema documents.
#[derive(Debug, Clone)]
pub enum OptionsSchema {
    Single(Value),
    Tuple(Vec<Value>),
}

impl OptionsSchema {
    /// Number of positional option slots this schema accepts.
    #[must_use]
    pub fn slots(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Tuple(schemas) => schemas.len(),
        }
    }

    /// Schema for positional slot `index`, if any.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Single(schema) => (index == 0).then_some(schema),
            Self::Tuple(schemas) => schemas.get(index),
        }
    }
}

/// Static metadata a rule declares about itself.
#[derive(Debug, Clone, Default)]
pub struct RuleMeta {
    /// Severity adopted when config says `inherit` (falls back to `error`)
    pub default_severity: Option<Severity>,
    /// Option schema; a rule without one accepts no options
    pub schema: Option<OptionsSchema>,
    /// Defaults that configured option values deep-merge onto
    pub default_options: Vec<Value>,
    /// Whether running this rule can mutate page state later rules assume
    /// pristine. Forces a page reset and fresh scope resolution afterwards.
    pub has_side_effects: bool,
}

/// A single lint rule.
///
/// Canonical id is `pluginNamespace/ruleName`, assigned when the owning
/// plugin is registered; the rule itself only knows its bare name.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Bare rule name (e.g. `"image-alt"`)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Static metadata (severity default, option schema, side effects)
    fn meta(&self) -> RuleMeta {
        RuleMeta::default()
    }

    /// Check the target. Violations go through `ctx.evaluate`'s in-page
    /// `report` channel or the host-side `ctx.report` passthrough.
    async fn run(&self, ctx: &RuleContext<'_>) -> Result<(), BoxError>;
}

/// A named bundle of rules and reusable configs.
///
/// Plugins are registered under a namespace by the configuration that
/// introduces them and are referenced, never copied, from then on.
#[derive(Default)]
pub struct Plugin {
    pub rules: BTreeMap<String, Arc<dyn Rule>>,
    pub configs: BTreeMap<String, Arc<ConfigObject>>,
}

impl Plugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under its own name.
    #[must_use]
    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.insert(rule.name().to_string(), rule);
        self
    }

    /// Register a reusable named config.
    #[must_use]
    pub fn with_config(mut self, name: impl Into<String>, config: ConfigObject) -> Self {
        self.configs.insert(name.into(), Arc::new(config));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_schema_has_one_slot() {
        let schema = OptionsSchema::Single(json!({"type": "object"}));
        assert_eq!(schema.slots(), 1);
        assert!(schema.slot(0).is_some());
        assert!(schema.slot(1).is_none());
    }

    #[test]
    fn test_tuple_schema_slots_are_positional() {
        let schema = OptionsSchema::Tuple(vec![json!({"type": "number"}), json!({"type": "string"})]);
        assert_eq!(schema.slots(), 2);
        assert_eq!(schema.slot(1), Some(&json!({"type": "string"})));
        assert!(schema.slot(2).is_none());
    }
}
