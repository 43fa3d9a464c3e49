//! The per-target orchestrator.

use crate::bridge::EvaluationBridge;
use crate::config::ResolvedConfiguration;
use crate::context::RuleContext;
use crate::error::LintError;
use crate::merge::merge_layers;
use crate::scope::{ScopeSpec, ScopeStabilizer};
use crate::suppress;
use serde_json::{json, Value};
use std::sync::Arc;
use viewlint_driver::{View, ViewSession};
use viewlint_types::{LintMessage, LintResult};

/// What a target points at: a URL opened through the default view, or a
/// named scene from the view registry.
#[derive(Debug, Clone)]
pub enum TargetKind {
    Url(String),
    Scene(String),
}

/// One option layer contributed by a target.
#[derive(Debug, Clone)]
pub enum OptionLayer {
    /// A named layer from the options registry
    Named(String),
    /// An ad hoc layer supplied with the target
    Inline(Value),
}

/// One lintable unit: a view, its option layers, and an optional scope.
#[derive(Clone)]
pub struct Target {
    pub id: String,
    pub kind: TargetKind,
    pub option_layers: Vec<OptionLayer>,
    pub scope: ScopeSpec,
}

impl Target {
    /// A URL target, opened through the linter's default view.
    #[must_use]
    pub fn url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TargetKind::Url(url.into()),
            option_layers: Vec::new(),
            scope: ScopeSpec::page(),
        }
    }

    /// A named-scene target, resolved against the view registry.
    #[must_use]
    pub fn scene(id: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TargetKind::Scene(view.into()),
            option_layers: Vec::new(),
            scope: ScopeSpec::page(),
        }
    }

    #[must_use]
    pub fn with_layer(mut self, layer: OptionLayer) -> Self {
        self.option_layers.push(layer);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ScopeSpec) -> Self {
        self.scope = scope;
        self
    }
}

/// Top-level driver: acquires a page per target, resolves scope, runs the
/// enabled rules in registration order through the bridge, applies
/// suppression, and aggregates a result.
pub struct Linter {
    config: ResolvedConfiguration,
    default_view: Arc<dyn View>,
}

impl Linter {
    #[must_use]
    pub fn new(config: ResolvedConfiguration, default_view: Arc<dyn View>) -> Self {
        Self {
            config,
            default_view,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolvedConfiguration {
        &self.config
    }

    /// Lint every target. Targets run fully in parallel, each owning an
    /// independent page session; results come back in target order. A
    /// failing target never affects its siblings.
    #[tracing::instrument(skip_all, fields(targets = targets.len()))]
    pub async fn lint(&self, targets: &[Target]) -> Vec<Result<LintResult, LintError>> {
        futures::future::join_all(targets.iter().map(|target| self.lint_target(target))).await
    }

    /// Lint one target.
    #[tracing::instrument(skip_all, fields(target = %target.id))]
    pub async fn lint_target(&self, target: &Target) -> Result<LintResult, LintError> {
        let options = self.merge_option_layers(target)?;
        let view = self.view_for(target)?;
        let mut session = view.setup(options.clone()).await?;

        // The page is released on every exit path, including rule failure.
        let outcome = self.run_rules(session.as_mut(), target, &options).await;
        if let Err(error) = session.close().await {
            tracing::warn!(target = %target.id, %error, "failed to close page session");
        }
        outcome
    }

    async fn run_rules(
        &self,
        session: &mut dyn ViewSession,
        target: &Target,
        options: &Value,
    ) -> Result<LintResult, LintError> {
        let page = session.page();
        let stabilizer = ScopeStabilizer::new();
        let mut scope = stabilizer
            .resolve(page.as_ref(), &self.config, &target.scope, options)
            .await?;
        let bridge = EvaluationBridge::new(Arc::clone(&page));

        let mut messages: Vec<LintMessage> = Vec::new();
        for (rule_id, rule, setting) in self.config.enabled_rules() {
            tracing::debug!(rule = rule_id, severity = %setting.severity, "running rule");
            bridge.begin(rule_id)?;
            let ctx = RuleContext::new(
                rule_id,
                &setting.options,
                &scope,
                Arc::clone(&page),
                &bridge,
            );
            let run = rule.run(&ctx).await;
            if let Err(source) = run {
                // Fail fast for this target; siblings are unaffected.
                return Err(LintError::RuleExecution {
                    rule_id: rule_id.to_string(),
                    source,
                });
            }
            let reports = bridge.finish()?;
            messages.extend(
                reports
                    .into_iter()
                    .map(|violation| LintMessage::stamp(violation, rule_id, setting.severity)),
            );

            if rule.meta().has_side_effects {
                // The rule may have mutated state later rules assume
                // pristine: reset and re-stabilize before the next one.
                tracing::debug!(rule = rule_id, "side-effecting rule: resetting page");
                session.reset().await?;
                scope = stabilizer
                    .resolve(page.as_ref(), &self.config, &target.scope, options)
                    .await?;
            }
        }

        let (kept, suppressed) = suppress::partition(page.as_ref(), messages).await?;
        let url = page.url().await?;
        tracing::info!(
            target = %target.id,
            messages = kept.len(),
            suppressed = suppressed.len(),
            "target linted"
        );
        Ok(LintResult::tally(&target.id, url, kept, suppressed))
    }

    /// Ordered deep merge of the target's option layers: the URL-derived
    /// layer first, then named and ad hoc layers in declaration order.
    fn merge_option_layers(&self, target: &Target) -> Result<Value, LintError> {
        let mut layers: Vec<Value> = Vec::new();
        if let TargetKind::Url(url) = &target.kind {
            layers.push(json!({ "url": url }));
        }
        for layer in &target.option_layers {
            match layer {
                OptionLayer::Named(name) => {
                    let named = self.config.option_layer(name).ok_or_else(|| {
                        LintError::UnknownOptionLayer {
                            name: name.clone(),
                            known: self.config.known_option_layers(),
                        }
                    })?;
                    layers.extend(named.iter().cloned());
                }
                OptionLayer::Inline(value) => layers.push(value.clone()),
            }
        }
        Ok(merge_layers(&layers))
    }

    fn view_for(&self, target: &Target) -> Result<Arc<dyn View>, LintError> {
        match &target.kind {
            TargetKind::Url(_) => Ok(Arc::clone(&self.default_view)),
            TargetKind::Scene(name) => {
                self.config.view(name).ok_or_else(|| LintError::UnknownView {
                    name: name.clone(),
                    known: self.config.known_views(),
                })
            }
        }
    }
}
