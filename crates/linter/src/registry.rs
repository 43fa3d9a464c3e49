//! Registry of the built-in plugin.

use crate::config::{
    resolve, ConfigFragment, ConfigObject, ConfiguredSeverity, ResolvedConfiguration, RuleSetting,
};
use crate::error::ConfigurationError;
use crate::rules::{DuplicateIdRule, ImageAltRule};
use crate::traits::Plugin;
use std::sync::{Arc, LazyLock};

/// Namespace the built-in plugin registers under.
pub const BUILTIN_NAMESPACE: &str = "viewlint";

/// Lazily initialized built-in plugin.
/// Rules are created once and shared across all engine instances.
static BUILTIN_PLUGIN: LazyLock<Arc<Plugin>> = LazyLock::new(|| {
    Arc::new(
        Plugin::new()
            .with_rule(Arc::new(ImageAltRule))
            .with_rule(Arc::new(DuplicateIdRule))
            .with_config(
                "recommended",
                ConfigObject::new()
                    .with_rule(
                        "viewlint/image-alt",
                        RuleSetting::severity(ConfiguredSeverity::Inherit),
                    )
                    .with_rule(
                        "viewlint/duplicate-id",
                        RuleSetting::severity(ConfiguredSeverity::Inherit),
                    ),
            ),
    )
});

/// The built-in plugin.
#[must_use]
pub fn builtin_plugin() -> Arc<Plugin> {
    Arc::clone(&BUILTIN_PLUGIN)
}

/// A fragment registering the built-in plugin under [`BUILTIN_NAMESPACE`].
#[must_use]
pub fn builtin_fragment() -> ConfigFragment {
    ConfigObject::new()
        .with_plugin(BUILTIN_NAMESPACE, builtin_plugin())
        .into()
}

/// Resolve user fragments with the built-in plugin already registered, so
/// `extends: "viewlint/recommended"` and bare built-in rule names work out
/// of the box.
pub fn resolve_with_builtins(
    fragments: Vec<ConfigFragment>,
) -> Result<ResolvedConfiguration, ConfigurationError> {
    let mut all = Vec::with_capacity(fragments.len() + 1);
    all.push(builtin_fragment());
    all.extend(fragments);
    resolve(all)
}
