use crate::context::RuleContext;
use crate::traits::{BoxError, Rule, RuleMeta};
use async_trait::async_trait;
use serde_json::Value;
use viewlint_types::Severity;

const CHECK_SOURCE: &str = r#"(ctx) => {
  const byId = new Map();
  for (const el of ctx.scope.queryAll("[id]")) {
    const id = el.getAttribute("id");
    if (!byId.has(id)) byId.set(id, []);
    byId.get(id).push(el);
  }
  for (const [id, els] of byId) {
    if (els.length < 2) continue;
    ctx.report({
      message: `id "${id}" is used by ${els.length} elements`,
      element: els[0],
      relations: els.slice(1).map((el) => ({
        description: "duplicate occurrence",
        element: el,
      })),
    });
  }
  return null;
}"#;

/// Flags element ids used more than once within the scope. The first
/// occurrence is the primary location; every other occurrence becomes a
/// relation.
pub struct DuplicateIdRule;

#[async_trait]
impl Rule for DuplicateIdRule {
    fn name(&self) -> &'static str {
        "duplicate-id"
    }

    fn description(&self) -> &'static str {
        "Flags element ids used by more than one element"
    }

    fn meta(&self) -> RuleMeta {
        RuleMeta {
            default_severity: Some(Severity::Error),
            ..RuleMeta::default()
        }
    }

    async fn run(&self, ctx: &RuleContext<'_>) -> Result<(), BoxError> {
        ctx.evaluate(CHECK_SOURCE, Value::Null).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_defaults_to_error_without_options() {
        let meta = DuplicateIdRule.meta();
        assert_eq!(meta.default_severity, Some(Severity::Error));
        assert!(meta.schema.is_none());
        assert!(meta.default_options.is_empty());
    }
}
