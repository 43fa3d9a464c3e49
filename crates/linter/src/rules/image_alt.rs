use crate::context::RuleContext;
use crate::traits::{BoxError, OptionsSchema, Rule, RuleMeta};
use async_trait::async_trait;
use serde_json::json;
use viewlint_types::Severity;

const CHECK_SOURCE: &str = r#"(ctx) => {
  const allowDecorative = Boolean(ctx.args && ctx.args.allowDecorative);
  for (const img of ctx.scope.queryAll("img")) {
    const alt = img.getAttribute("alt");
    const missing = alt === null || (!allowDecorative && alt.trim() === "");
    if (missing) {
      ctx.report({ message: "image has no alt text", element: img });
    }
  }
  return null;
}"#;

/// Requires a non-empty `alt` attribute on rendered images.
///
/// With `allowDecorative`, an explicitly empty `alt=""` passes (the HTML
/// idiom for decorative images); a missing attribute never does.
pub struct ImageAltRule;

#[async_trait]
impl Rule for ImageAltRule {
    fn name(&self) -> &'static str {
        "image-alt"
    }

    fn description(&self) -> &'static str {
        "Requires rendered images to carry alt text"
    }

    fn meta(&self) -> RuleMeta {
        RuleMeta {
            default_severity: Some(Severity::Warn),
            schema: Some(OptionsSchema::Single(json!({
                "type": "object",
                "properties": {
                    "allowDecorative": { "type": "boolean" }
                },
                "additionalProperties": false,
            }))),
            default_options: vec![json!({ "allowDecorative": false })],
            has_side_effects: false,
        }
    }

    async fn run(&self, ctx: &RuleContext<'_>) -> Result<(), BoxError> {
        let args = ctx.option(0).cloned().unwrap_or_else(|| json!({}));
        ctx.evaluate(CHECK_SOURCE, args).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EvaluationBridge, REPORT_BINDING};
    use crate::config::resolve;
    use crate::scope::{ScopeSpec, ScopeStabilizer};
    use serde_json::Value;
    use std::sync::Arc;
    use viewlint_driver::Page;
    use viewlint_test_utils::{FakeDom, FakePage};

    #[tokio::test]
    async fn test_run_forwards_configured_options_into_the_page() {
        let page = FakePage::new(FakeDom::new());
        page.on_script("viewlint-adapter-install", |_, _| Ok(json!(true)));
        // Simulate the in-page check: echo the forwarded args back as a
        // report so the host side can observe them.
        page.on_script("queryAll(\"img\")", |_, invocation| {
            let args = invocation.json_arg(1).cloned().unwrap_or(Value::Null);
            let payload = json!({
                "message": format!("allowDecorative={}", args["allowDecorative"]),
                "location": {"selector": "img:nth-of-type(1)", "tagName": "img"},
            });
            invocation
                .call_binding(REPORT_BINDING, json!(payload.to_string()))
                .map_err(|e| e.to_string())?;
            Ok(Value::Null)
        });

        let page_arc: Arc<dyn Page> = Arc::new(page.clone());
        let scope = ScopeStabilizer::new()
            .resolve(&page, &resolve(vec![]).unwrap(), &ScopeSpec::page(), &json!({}))
            .await
            .unwrap();
        let bridge = EvaluationBridge::new(Arc::clone(&page_arc));
        bridge.begin("viewlint/image-alt").unwrap();
        let options = vec![json!({ "allowDecorative": true })];
        let ctx = RuleContext::new(
            "viewlint/image-alt",
            &options,
            &scope,
            Arc::clone(&page_arc),
            &bridge,
        );
        ImageAltRule.run(&ctx).await.unwrap();

        let reports = bridge.finish().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "allowDecorative=true");
    }

    #[test]
    fn test_meta_declares_schema_and_defaults() {
        let meta = ImageAltRule.meta();
        assert_eq!(meta.default_severity, Some(Severity::Warn));
        assert_eq!(meta.default_options, vec![json!({"allowDecorative": false})]);
        assert!(!meta.has_side_effects);
    }
}
