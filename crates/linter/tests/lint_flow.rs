//! End-to-end engine tests against the in-memory fake driver.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use viewlint_linter::{
    BoxError, ConfigObject, ConfiguredSeverity, Extend, LintError, Linter, OptionLayer, Plugin,
    Rule, RuleContext, RuleMeta, RuleSetting, ScopeSpec, Target, REPORT_BINDING, SUPPRESS_ATTR,
};
use viewlint_test_utils::{FakeDom, FakeView};
use viewlint_types::{ElementLocation, Severity, Violation};

/// A rule that runs a named in-page script; what the script does is decided
/// by the handler the test registers for it.
struct ScriptRule {
    name: &'static str,
    source: &'static str,
    meta: RuleMeta,
}

#[async_trait]
impl Rule for ScriptRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "test script rule"
    }

    fn meta(&self) -> RuleMeta {
        self.meta.clone()
    }

    async fn run(&self, ctx: &RuleContext<'_>) -> Result<(), BoxError> {
        ctx.evaluate(self.source, Value::Null).await?;
        Ok(())
    }
}

/// A rule that reports from the host side without entering the page.
struct HostReportRule;

#[async_trait]
impl Rule for HostReportRule {
    fn name(&self) -> &'static str {
        "host-report"
    }

    fn description(&self) -> &'static str {
        "reports a violation with a host-side location"
    }

    async fn run(&self, ctx: &RuleContext<'_>) -> Result<(), BoxError> {
        ctx.report(Violation::new(
            "reported from the host",
            ElementLocation::new("#host-el", "div"),
        ))?;
        Ok(())
    }
}

/// A rule whose own logic fails.
struct FailingRule;

#[async_trait]
impl Rule for FailingRule {
    fn name(&self) -> &'static str {
        "always-fails"
    }

    fn description(&self) -> &'static str {
        "fails unconditionally"
    }

    async fn run(&self, _ctx: &RuleContext<'_>) -> Result<(), BoxError> {
        Err("deliberate failure".into())
    }
}

fn ack_adapter(view: &FakeView) {
    view.on_script("viewlint-adapter-install", |_, _| Ok(json!(true)));
}

/// Register the canonical "report once per scope root" behavior for a
/// script sentinel.
fn emit_per_root(view: &FakeView, sentinel: &str) {
    view.on_script(sentinel.to_string(), |_, invocation| {
        let markers = invocation.json_arg(0).cloned().unwrap_or_default();
        for marker in markers.as_array().into_iter().flatten() {
            let marker = marker.as_str().unwrap_or_default();
            let payload = json!({
                "message": "defect in root",
                "location": {
                    "selector": format!("[data-viewlint-scope=\"{marker}\"]"),
                    "tagName": "section",
                },
            });
            invocation
                .call_binding(REPORT_BINDING, json!(payload.to_string()))
                .map_err(|e| e.to_string())?;
        }
        Ok(Value::Null)
    });
}

fn two_card_dom() -> FakeDom {
    let mut dom = FakeDom::new();
    for _ in 0..2 {
        let card = dom.add_element(dom.body(), "section");
        dom.set_attr(card, "class", "card");
    }
    dom
}

#[tokio::test]
async fn test_one_violation_per_scope_root_counts_as_errors() {
    // Scenario: a rule with no declared default severity (so `inherit`
    // resolves to error) reports once per each of two scope roots.
    let view = FakeView::new(two_card_dom);
    ack_adapter(&view);
    emit_per_root(&view, "per-root-check");

    let plugin = Arc::new(Plugin::new().with_rule(Arc::new(ScriptRule {
        name: "per-root",
        source: "(ctx) => per-root-check",
        meta: RuleMeta::default(),
    })));
    let config = ConfigObject::new()
        .with_plugin("test", plugin)
        .with_rule("test/per-root", RuleSetting::severity(ConfiguredSeverity::Inherit));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view.clone()),
    );

    let target = Target::url("t1", "https://example.test/").with_scope(ScopeSpec::selector(".card"));
    let result = linter.lint_target(&target).await.unwrap();

    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.error_count, 2);
    assert_eq!(result.warning_count, 0);
    assert!(result.suppressed_messages.is_empty());
    assert!(result
        .messages
        .iter()
        .all(|m| m.rule_id == "test/per-root" && m.severity == Severity::Error));
    assert_eq!(result.url, "https://example.test/");
    assert_eq!(view.close_count(), 1);
}

#[tokio::test]
async fn test_side_effecting_rule_forces_reset_and_rescope() {
    // First rule dirties the DOM; the second must observe pristine content
    // and freshly resolved scope roots.
    let view = FakeView::new(FakeDom::new);
    ack_adapter(&view);
    view.on_script("dirty-the-page", |dom, _| {
        let extra = dom.add_element(dom.body(), "div");
        dom.set_attr(extra, "class", "residue");
        Ok(Value::Null)
    });
    view.on_script("count-residue", |dom, invocation| {
        let payload = json!({
            "message": format!("residue={}", dom.query(".residue").len()),
            "location": {"selector": "body", "tagName": "body"},
        });
        invocation
            .call_binding(REPORT_BINDING, json!(payload.to_string()))
            .map_err(|e| e.to_string())?;
        Ok(Value::Null)
    });

    let plugin = Arc::new(
        Plugin::new()
            .with_rule(Arc::new(ScriptRule {
                name: "a-mutator",
                source: "(ctx) => dirty-the-page",
                meta: RuleMeta {
                    has_side_effects: true,
                    ..RuleMeta::default()
                },
            }))
            .with_rule(Arc::new(ScriptRule {
                name: "b-counter",
                source: "(ctx) => count-residue",
                meta: RuleMeta::default(),
            })),
    );
    let config = ConfigObject::new()
        .with_plugin("test", plugin)
        .with_rule("test/a-mutator", RuleSetting::severity(ConfiguredSeverity::Warn))
        .with_rule("test/b-counter", RuleSetting::severity(ConfiguredSeverity::Warn));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view.clone()),
    );

    let result = linter
        .lint_target(&Target::url("t", "https://example.test/"))
        .await
        .unwrap();

    // Element counts reflect the post-reset content, not mutation residue.
    let counter_messages: Vec<_> = result
        .messages
        .iter()
        .filter(|m| m.rule_id == "test/b-counter")
        .collect();
    assert_eq!(counter_messages.len(), 1);
    assert_eq!(counter_messages[0].message, "residue=0");
    assert_eq!(view.reset_count(), 1);
}

#[tokio::test]
async fn test_suppression_routes_messages_by_rule_id_and_all() {
    let view = FakeView::new(|| {
        let mut dom = FakeDom::new();
        let wrap = dom.add_element(dom.body(), "section");
        dom.set_attr(wrap, "id", "wrap");
        dom.set_attr(wrap, SUPPRESS_ATTR, "test/quiet");
        let inner = dom.add_element(wrap, "div");
        dom.set_attr(inner, "id", "inner");
        let everything = dom.add_element(dom.body(), "aside");
        dom.set_attr(everything, "id", "silenced");
        dom.set_attr(everything, SUPPRESS_ATTR, "all");
        dom
    });
    ack_adapter(&view);
    view.on_script("report-inner", |_, invocation| {
        for selector in ["#inner", "#silenced"] {
            let payload = json!({
                "message": "found",
                "location": {"selector": selector, "tagName": "div"},
            });
            invocation
                .call_binding(REPORT_BINDING, json!(payload.to_string()))
                .map_err(|e| e.to_string())?;
        }
        Ok(Value::Null)
    });

    let quiet = Arc::new(ScriptRule {
        name: "quiet",
        source: "(ctx) => report-inner",
        meta: RuleMeta::default(),
    });
    let loud = Arc::new(ScriptRule {
        name: "loud",
        source: "(ctx) => report-inner",
        meta: RuleMeta::default(),
    });
    let plugin = Arc::new(Plugin::new().with_rule(quiet).with_rule(loud));
    let config = ConfigObject::new()
        .with_plugin("test", plugin)
        .with_rule("test/quiet", RuleSetting::severity(ConfiguredSeverity::Warn))
        .with_rule("test/loud", RuleSetting::severity(ConfiguredSeverity::Warn));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view.clone()),
    );

    let result = linter
        .lint_target(&Target::url("t", "https://example.test/"))
        .await
        .unwrap();

    // `test/quiet` on #inner is suppressed by the ancestor token; both rules
    // are suppressed under the `all` subtree; `test/loud` on #inner stays.
    let kept: Vec<_> = result
        .messages
        .iter()
        .map(|m| (m.rule_id.as_str(), m.location.selector.as_str()))
        .collect();
    assert_eq!(kept, vec![("test/loud", "#inner")]);
    assert_eq!(result.suppressed_messages.len(), 3);
    assert_eq!(result.warning_count, 1);
}

#[tokio::test]
async fn test_host_side_report_passthrough() {
    let view = FakeView::new(FakeDom::new);
    let plugin = Arc::new(Plugin::new().with_rule(Arc::new(HostReportRule)));
    let config = ConfigObject::new()
        .with_plugin("test", plugin)
        .with_rule("host-report", RuleSetting::severity(ConfiguredSeverity::Info));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view),
    );

    let result = linter
        .lint_target(&Target::url("t", "https://example.test/"))
        .await
        .unwrap();
    assert_eq!(result.messages.len(), 1);
    assert_eq!(result.messages[0].severity, Severity::Info);
    assert_eq!(result.info_count, 1);
    assert_eq!(result.messages[0].location.selector, "#host-el");
}

#[tokio::test]
async fn test_failing_rule_aborts_target_but_not_siblings() {
    let view = FakeView::new(FakeDom::new);
    ack_adapter(&view);
    emit_per_root(&view, "healthy-check");

    let plugin = Arc::new(
        Plugin::new()
            .with_rule(Arc::new(FailingRule))
            .with_rule(Arc::new(ScriptRule {
                name: "never-runs",
                source: "(ctx) => healthy-check",
                meta: RuleMeta::default(),
            })),
    );
    // BTreeMap order puts always-fails first, so the second rule must be
    // skipped for the failing target.
    let config = ConfigObject::new()
        .with_plugin("test", plugin)
        .with_rule("test/always-fails", RuleSetting::severity(ConfiguredSeverity::Error))
        .with_rule("test/never-runs", RuleSetting::severity(ConfiguredSeverity::Error));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view.clone()),
    );

    let targets = vec![
        Target::url("first", "https://a.test/"),
        Target::url("second", "https://b.test/"),
    ];
    let results = linter.lint(&targets).await;
    assert_eq!(results.len(), 2);

    for result in &results {
        match result {
            Err(LintError::RuleExecution { rule_id, .. }) => {
                assert_eq!(rule_id, "test/always-fails");
            }
            other => panic!("expected RuleExecution, got {other:?}"),
        }
    }
    // Pages are released on the failure path too.
    assert_eq!(view.close_count(), 2);
}

#[tokio::test]
async fn test_option_layers_merge_in_order_into_view_setup() {
    let view = FakeView::new(FakeDom::new);
    let config = ConfigObject::new().with_option_layer(
        "mobile",
        json!({"viewport": {"width": 390, "height": 844}, "touch": true}),
    );
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view.clone()),
    );

    let target = Target::url("t", "https://example.test/")
        .with_layer(OptionLayer::Named("mobile".to_string()))
        .with_layer(OptionLayer::Inline(json!({"viewport": {"width": 412}})));
    linter.lint_target(&target).await.unwrap();

    assert_eq!(
        view.setup_options(),
        vec![json!({
            "url": "https://example.test/",
            "viewport": {"width": 412, "height": 844},
            "touch": true,
        })]
    );
}

#[tokio::test]
async fn test_unknown_option_layer_lists_known_names() {
    let view = FakeView::new(FakeDom::new);
    let config = ConfigObject::new().with_option_layer("mobile", json!({}));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(view),
    );

    let target = Target::url("t", "https://example.test/")
        .with_layer(OptionLayer::Named("desktop".to_string()));
    let err = linter.lint_target(&target).await.unwrap_err();
    match err {
        LintError::UnknownOptionLayer { name, known } => {
            assert_eq!(name, "desktop");
            assert_eq!(known, vec!["mobile"]);
        }
        other => panic!("expected UnknownOptionLayer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scene_target_resolves_view_registry() {
    let default_view = FakeView::new(FakeDom::new);
    let dialog_view = FakeView::new(FakeDom::new);
    let config =
        ConfigObject::new().with_view("dialog", Arc::new(dialog_view.clone()));
    let linter = Linter::new(
        viewlint_linter::resolve(vec![config.into()]).unwrap(),
        Arc::new(default_view.clone()),
    );

    linter
        .lint_target(&Target::scene("t", "dialog"))
        .await
        .unwrap();
    assert_eq!(dialog_view.setup_options().len(), 1);
    assert!(default_view.setup_options().is_empty());

    let err = linter
        .lint_target(&Target::scene("t2", "missing"))
        .await
        .unwrap_err();
    match err {
        LintError::UnknownView { known, .. } => assert_eq!(known, vec!["dialog"]),
        other => panic!("expected UnknownView, got {other:?}"),
    }
}

#[tokio::test]
async fn test_extends_recommended_runs_builtin_rules() {
    // The built-in duplicate-id rule reports through the real adapter
    // contract: the handler mirrors what the in-page check would find.
    let view = FakeView::new(|| {
        let mut dom = FakeDom::new();
        let a = dom.add_element(dom.body(), "div");
        dom.set_attr(a, "id", "dup");
        let b = dom.add_element(dom.body(), "div");
        dom.set_attr(b, "id", "dup");
        dom
    });
    ack_adapter(&view);
    view.on_script("queryAll(\"[id]\")", |dom, invocation| {
        let ids = dom.query("[id]");
        if ids.len() >= 2 {
            let payload = json!({
                "message": "id \"dup\" is used by 2 elements",
                "location": {"selector": "#dup", "tagName": "div", "id": "dup"},
                "relations": [{
                    "description": "duplicate occurrence",
                    "location": {"selector": "#dup", "tagName": "div", "id": "dup"},
                }],
            });
            invocation
                .call_binding(REPORT_BINDING, json!(payload.to_string()))
                .map_err(|e| e.to_string())?;
        }
        Ok(Value::Null)
    });
    view.on_script("queryAll(\"img\")", |_, _| Ok(Value::Null));

    let config = ConfigObject::new().with_extend(Extend::reference("viewlint/recommended"));
    let linter = Linter::new(
        viewlint_linter::resolve_with_builtins(vec![config.into()]).unwrap(),
        Arc::new(view),
    );

    let result = linter
        .lint_target(&Target::url("t", "https://example.test/"))
        .await
        .unwrap();
    assert_eq!(result.error_count, 1);
    assert_eq!(result.messages[0].rule_id, "viewlint/duplicate-id");
    assert_eq!(result.messages[0].relations.len(), 1);
    assert_eq!(result.recommend_count, 0);
}
