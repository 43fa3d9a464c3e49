//! Configuration fragments and their resolution into a canonical registry.
//!
//! Resolution is a pure data transform: an ordered list of fragments
//! (possibly nested in arrays) merges into one [`ResolvedConfiguration`].
//! Per fragment the order is fixed: its `plugins` merge first (so extends
//! references can resolve against namespaces the same fragment introduced),
//! then its `extends` entries expand recursively, then its own
//! rules/options/views/scopes merge. Every failure is a
//! [`ConfigurationError`], raised eagerly, never deferred to run time.

use crate::error::ConfigurationError;
use crate::merge::deep_merge;
use crate::scope::ScopeDef;
use crate::traits::{Plugin, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use viewlint_driver::View;
use viewlint_types::Severity;

/// Severity as written in configuration.
///
/// `inherit` is valid only here: resolution replaces it with the rule's
/// declared default severity (or `error`), so it never appears at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfiguredSeverity {
    Off,
    Info,
    Warn,
    Error,
    Inherit,
}

impl ConfiguredSeverity {
    /// Resolve against a rule's declared default.
    fn resolve(self, declared_default: Option<Severity>) -> Severity {
        match self {
            Self::Off => Severity::Off,
            Self::Info => Severity::Info,
            Self::Warn => Severity::Warn,
            Self::Error => Severity::Error,
            Self::Inherit => declared_default.unwrap_or(Severity::Error),
        }
    }

    const fn is_inherit(self) -> bool {
        matches!(self, Self::Inherit)
    }
}

impl From<Severity> for ConfiguredSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Off => Self::Off,
            Severity::Info => Self::Info,
            Severity::Warn => Self::Warn,
            Severity::Error => Self::Error,
        }
    }
}

/// Setting for one rule inside a fragment: a severity, optionally with
/// positional option values (the `[severity, ...options]` form).
#[derive(Clone)]
pub struct RuleSetting {
    pub severity: ConfiguredSeverity,
    /// `None` means "no values supplied", which is not the same as an empty
    /// list: `inherit` with no values retains previously resolved options.
    pub options: Option<Vec<Value>>,
}

impl RuleSetting {
    #[must_use]
    pub const fn severity(severity: ConfiguredSeverity) -> Self {
        Self {
            severity,
            options: None,
        }
    }

    #[must_use]
    pub const fn with_options(severity: ConfiguredSeverity, options: Vec<Value>) -> Self {
        Self {
            severity,
            options: Some(options),
        }
    }
}

/// One configuration fragment.
#[derive(Default)]
pub struct ConfigObject {
    /// Plugins introduced by this fragment, by namespace
    pub plugins: BTreeMap<String, Arc<Plugin>>,
    /// Rule settings, by canonical or bare rule id
    pub rules: BTreeMap<String, RuleSetting>,
    /// Named option layers
    pub options: BTreeMap<String, Vec<Value>>,
    /// Named views
    pub views: BTreeMap<String, Arc<dyn View>>,
    /// Named scopes
    pub scopes: BTreeMap<String, Vec<ScopeDef>>,
    /// Configs to include before this fragment's own settings apply
    pub extends: Vec<Extend>,
}

impl ConfigObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_plugin(mut self, namespace: impl Into<String>, plugin: Arc<Plugin>) -> Self {
        self.plugins.insert(namespace.into(), plugin);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, id: impl Into<String>, setting: RuleSetting) -> Self {
        self.rules.insert(id.into(), setting);
        self
    }

    #[must_use]
    pub fn with_option_layer(mut self, name: impl Into<String>, layer: Value) -> Self {
        self.options.insert(name.into(), vec![layer]);
        self
    }

    #[must_use]
    pub fn with_option_layers(mut self, name: impl Into<String>, layers: Vec<Value>) -> Self {
        self.options.insert(name.into(), layers);
        self
    }

    #[must_use]
    pub fn with_view(mut self, name: impl Into<String>, view: Arc<dyn View>) -> Self {
        self.views.insert(name.into(), view);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>, scope: ScopeDef) -> Self {
        self.scopes.insert(name.into(), vec![scope]);
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, name: impl Into<String>, scopes: Vec<ScopeDef>) -> Self {
        self.scopes.insert(name.into(), scopes);
        self
    }

    #[must_use]
    pub fn with_extend(mut self, extend: Extend) -> Self {
        self.extends.push(extend);
        self
    }
}

/// An `extends` entry: a string reference into a plugin's configs, or a
/// literal fragment.
#[derive(Clone)]
pub enum Extend {
    Ref(String),
    Inline(ConfigFragment),
}

impl Extend {
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }
}

/// A fragment tree node: an object or an array of further fragments.
///
/// Nodes are `Arc`ed so the resolver can detect a structure that embeds
/// itself (directly or through plugin configs) by pointer identity.
#[derive(Clone)]
pub enum ConfigFragment {
    Object(Arc<ConfigObject>),
    List(Arc<Vec<ConfigFragment>>),
}

impl ConfigFragment {
    /// Identity of this node for cycle detection.
    fn node_id(&self) -> usize {
        match self {
            Self::Object(object) => Arc::as_ptr(object).cast::<()>() as usize,
            Self::List(list) => Arc::as_ptr(list).cast::<()>() as usize,
        }
    }
}

impl From<ConfigObject> for ConfigFragment {
    fn from(object: ConfigObject) -> Self {
        Self::Object(Arc::new(object))
    }
}

impl From<Vec<ConfigFragment>> for ConfigFragment {
    fn from(list: Vec<ConfigFragment>) -> Self {
        Self::List(Arc::new(list))
    }
}

/// Resolved, schema-checked settings for one canonical rule id.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    pub severity: Severity,
    pub options: Vec<Value>,
}

/// The canonical registry built once per engine instance.
pub struct ResolvedConfiguration {
    plugins: BTreeMap<String, Arc<Plugin>>,
    rules: BTreeMap<String, Arc<dyn Rule>>,
    /// Canonical rule ids in plugin registration order
    rule_order: Vec<String>,
    settings: BTreeMap<String, RuleConfig>,
    options: BTreeMap<String, Vec<Value>>,
    views: BTreeMap<String, Arc<dyn View>>,
    scopes: BTreeMap<String, Vec<ScopeDef>>,
}

impl std::fmt::Debug for ResolvedConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfiguration")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("rule_order", &self.rule_order)
            .field("settings", &self.settings)
            .field("options", &self.options)
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResolvedConfiguration {
    /// Plugin registered under `namespace`.
    #[must_use]
    pub fn plugin(&self, namespace: &str) -> Option<&Arc<Plugin>> {
        self.plugins.get(namespace)
    }

    /// Rule for a canonical id.
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(id)
    }

    /// Resolved settings for a canonical id.
    #[must_use]
    pub fn setting(&self, id: &str) -> Option<&RuleConfig> {
        self.settings.get(id)
    }

    /// Canonical ids of all registered rules, sorted.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Configured rules with severity ≠ off, in registration order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&str, &Arc<dyn Rule>, &RuleConfig)> {
        self.rule_order.iter().filter_map(|id| {
            let setting = self.settings.get(id)?;
            if !setting.severity.is_enabled() {
                return None;
            }
            Some((id.as_str(), &self.rules[id], setting))
        })
    }

    #[must_use]
    pub fn option_layer(&self, name: &str) -> Option<&[Value]> {
        self.options.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn known_option_layers(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    #[must_use]
    pub fn view(&self, name: &str) -> Option<Arc<dyn View>> {
        self.views.get(name).cloned()
    }

    #[must_use]
    pub fn known_views(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }

    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&[ScopeDef]> {
        self.scopes.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn known_scopes(&self) -> Vec<String> {
        self.scopes.keys().cloned().collect()
    }
}

/// Resolve an ordered list of fragments into the canonical registry.
#[tracing::instrument(skip_all, fields(fragments = fragments.len()))]
pub fn resolve(fragments: Vec<ConfigFragment>) -> Result<ResolvedConfiguration, ConfigurationError> {
    let mut resolver = Resolver::default();
    for fragment in &fragments {
        resolver.expand(fragment, None)?;
    }
    tracing::debug!(
        plugins = resolver.plugins.len(),
        rules = resolver.rules.len(),
        configured = resolver.settings.len(),
        "configuration resolved"
    );
    Ok(ResolvedConfiguration {
        plugins: resolver.plugins,
        rules: resolver.rules,
        rule_order: resolver.rule_order,
        settings: resolver.settings,
        options: resolver.options,
        views: resolver.views,
        scopes: resolver.scopes,
    })
}

/// One in-flight expansion frame, for cycle detection and error chains.
struct Frame {
    node: usize,
    label: String,
}

#[derive(Default)]
struct Resolver {
    plugins: BTreeMap<String, Arc<Plugin>>,
    rules: BTreeMap<String, Arc<dyn Rule>>,
    rule_order: Vec<String>,
    settings: BTreeMap<String, RuleConfig>,
    options: BTreeMap<String, Vec<Value>>,
    views: BTreeMap<String, Arc<dyn View>>,
    scopes: BTreeMap<String, Vec<ScopeDef>>,
    stack: Vec<Frame>,
}

const ANONYMOUS_FRAGMENT: &str = "<fragment>";

impl Resolver {
    fn expand(
        &mut self,
        fragment: &ConfigFragment,
        reference: Option<String>,
    ) -> Result<(), ConfigurationError> {
        let node = fragment.node_id();
        let label = reference.unwrap_or_else(|| ANONYMOUS_FRAGMENT.to_string());

        // Revisiting a named reference or a literal node mid-expansion is a
        // cycle either way; the chain names every frame on the way in.
        let named_revisit = label != ANONYMOUS_FRAGMENT && self.stack.iter().any(|f| f.label == label);
        if named_revisit || self.stack.iter().any(|f| f.node == node) {
            let mut chain: Vec<String> = self.stack.iter().map(|f| f.label.clone()).collect();
            chain.push(label);
            return Err(ConfigurationError::CircularExtends { chain });
        }

        self.stack.push(Frame { node, label });
        let result = match fragment {
            ConfigFragment::List(list) => {
                let mut result = Ok(());
                for child in list.iter() {
                    result = self.expand(child, None);
                    if result.is_err() {
                        break;
                    }
                }
                result
            }
            ConfigFragment::Object(object) => self.expand_object(object),
        };
        self.stack.pop();
        result
    }

    fn expand_object(&mut self, object: &ConfigObject) -> Result<(), ConfigurationError> {
        for (namespace, plugin) in &object.plugins {
            self.register_plugin(namespace, plugin)?;
        }

        for extend in &object.extends {
            match extend {
                Extend::Ref(reference) => {
                    let (canonical, config) = self.lookup_config(reference)?;
                    tracing::trace!(reference = %reference, resolved = %canonical, "expanding extends");
                    self.expand(&ConfigFragment::Object(config), Some(canonical))?;
                }
                Extend::Inline(fragment) => self.expand(fragment, None)?,
            }
        }

        for (reference, setting) in &object.rules {
            self.apply_rule_setting(reference, setting)?;
        }

        for (name, layers) in &object.options {
            self.options.insert(name.clone(), layers.clone());
        }
        for (name, view) in &object.views {
            self.views.insert(name.clone(), Arc::clone(view));
        }
        for (name, defs) in &object.scopes {
            self.scopes.insert(name.clone(), defs.clone());
        }

        Ok(())
    }

    fn register_plugin(
        &mut self,
        namespace: &str,
        plugin: &Arc<Plugin>,
    ) -> Result<(), ConfigurationError> {
        if let Some(existing) = self.plugins.get(namespace) {
            if Arc::ptr_eq(existing, plugin) {
                return Ok(());
            }
            return Err(ConfigurationError::PluginConflict {
                namespace: namespace.to_string(),
            });
        }

        tracing::debug!(namespace, rules = plugin.rules.len(), "registering plugin");
        self.plugins.insert(namespace.to_string(), Arc::clone(plugin));
        for (name, rule) in &plugin.rules {
            let canonical = format!("{namespace}/{name}");
            self.rules.insert(canonical.clone(), Arc::clone(rule));
            self.rule_order.push(canonical);
        }
        Ok(())
    }

    /// Resolve an extends string to `(canonical name, config object)`.
    ///
    /// `namespace/name` looks up directly; a bare name resolves by unique
    /// suffix match over the namespaces known so far.
    fn lookup_config(
        &self,
        reference: &str,
    ) -> Result<(String, Arc<ConfigObject>), ConfigurationError> {
        if let Some((namespace, name)) = reference.split_once('/') {
            let plugin = self.plugins.get(namespace).ok_or_else(|| {
                ConfigurationError::UnknownPlugin {
                    namespace: namespace.to_string(),
                    known: self.plugins.keys().cloned().collect(),
                }
            })?;
            let config = plugin.configs.get(name).ok_or_else(|| {
                ConfigurationError::UnknownConfig {
                    reference: reference.to_string(),
                    candidates: self.known_configs(),
                }
            })?;
            return Ok((reference.to_string(), Arc::clone(config)));
        }

        let mut matches: Vec<(String, Arc<ConfigObject>)> = self
            .plugins
            .iter()
            .filter_map(|(namespace, plugin)| {
                plugin
                    .configs
                    .get(reference)
                    .map(|config| (format!("{namespace}/{reference}"), Arc::clone(config)))
            })
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(ConfigurationError::UnknownConfig {
                reference: reference.to_string(),
                candidates: self.known_configs(),
            }),
            _ => Err(ConfigurationError::AmbiguousConfig {
                reference: reference.to_string(),
                candidates: matches.into_iter().map(|(name, _)| name).collect(),
            }),
        }
    }

    fn known_configs(&self) -> Vec<String> {
        self.plugins
            .iter()
            .flat_map(|(namespace, plugin)| {
                plugin
                    .configs
                    .keys()
                    .map(move |name| format!("{namespace}/{name}"))
            })
            .collect()
    }

    /// Resolve a canonical or bare rule reference to a canonical id.
    fn lookup_rule(&self, reference: &str) -> Result<String, ConfigurationError> {
        if reference.contains('/') {
            if self.rules.contains_key(reference) {
                return Ok(reference.to_string());
            }
            return Err(ConfigurationError::UnknownRule {
                reference: reference.to_string(),
                candidates: self.rules.keys().cloned().collect(),
            });
        }

        let mut matches: Vec<String> = self
            .rules
            .keys()
            .filter(|id| id.rsplit_once('/').is_some_and(|(_, name)| name == reference))
            .cloned()
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(ConfigurationError::UnknownRule {
                reference: reference.to_string(),
                candidates: self.rules.keys().cloned().collect(),
            }),
            _ => Err(ConfigurationError::AmbiguousRule {
                reference: reference.to_string(),
                candidates: matches,
            }),
        }
    }

    fn apply_rule_setting(
        &mut self,
        reference: &str,
        setting: &RuleSetting,
    ) -> Result<(), ConfigurationError> {
        let id = self.lookup_rule(reference)?;
        let meta = self.rules[&id].meta();

        let severity = setting.severity.resolve(meta.default_severity);
        let options = match &setting.options {
            Some(supplied) => validate_options(&id, &meta, supplied)?,
            None if setting.severity.is_inherit() => {
                // Inherit without new values keeps what was already resolved.
                match self.settings.get(&id) {
                    Some(previous) => previous.options.clone(),
                    None => validate_options(&id, &meta, &[])?,
                }
            }
            None => validate_options(&id, &meta, &[])?,
        };

        tracing::trace!(rule = %id, severity = %severity, "applying rule setting");
        self.settings.insert(id, RuleConfig { severity, options });
        Ok(())
    }
}

/// Deep-merge supplied positional values onto the rule's declared defaults,
/// then validate each slot against the rule's schema.
fn validate_options(
    rule_id: &str,
    meta: &crate::traits::RuleMeta,
    supplied: &[Value],
) -> Result<Vec<Value>, ConfigurationError> {
    let Some(schema) = &meta.schema else {
        if supplied.is_empty() {
            return Ok(meta.default_options.clone());
        }
        return Err(ConfigurationError::OptionsNotAccepted {
            rule: rule_id.to_string(),
        });
    };

    let slots = schema.slots();
    if supplied.len() > slots {
        return Err(ConfigurationError::TooManyOptions {
            rule: rule_id.to_string(),
            given: supplied.len(),
            slots,
        });
    }

    let defaults = &meta.default_options;
    let count = supplied.len().max(defaults.len()).min(slots);
    let mut resolved = Vec::with_capacity(count);
    for index in 0..count {
        let value = match (defaults.get(index), supplied.get(index)) {
            (Some(default), Some(value)) => {
                let mut merged = default.clone();
                deep_merge(&mut merged, value);
                merged
            }
            (Some(default), None) => default.clone(),
            (None, Some(value)) => value.clone(),
            (None, None) => unreachable!("count is bounded by both lists"),
        };

        if let Some(slot_schema) = schema.slot(index) {
            let validator = jsonschema::validator_for(slot_schema).map_err(|error| {
                ConfigurationError::InvalidSchema {
                    rule: rule_id.to_string(),
                    detail: error.to_string(),
                }
            })?;
            validator
                .validate(&value)
                .map_err(|error| ConfigurationError::InvalidOptions {
                    rule: rule_id.to_string(),
                    detail: error.to_string(),
                })?;
        }
        resolved.push(value);
    }
    Ok(resolved)
}
