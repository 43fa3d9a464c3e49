//! The evaluation bridge: running rule logic inside the page.
//!
//! Structurally this is an RPC call with reference marshaling: arguments are
//! serialized, element handles are lifted into a positional reference table,
//! the function executes remotely with `{report, scope, args}` injected, and
//! the return value is deserialized. Violations do not travel with the
//! return value: the page-side adapter resolves each offending element to a
//! durable location descriptor and forwards the payload through a persistent
//! host-side binding into whichever buffer is currently active.

use crate::error::LintError;
use crate::scope::ScopeSet;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use viewlint_driver::{CallArg, DriverError, ElementRef, Page};

/// Global name of the persistent report binding.
pub const REPORT_BINDING: &str = "__viewlintReport";

/// Marker key rules use to put an element handle inside evaluate args.
const ELEMENT_KEY: &str = "__viewlintElement";

/// Marker key the unboxed args use to point into the reference table.
const REF_KEY: &str = "__viewlintRef";

/// Page-side adapter: selector-path generator, location descriptor builder,
/// scope query surface, and the `report` entry point. Installed once per
/// content generation; returns `true` so the host can verify the install
/// took.
const ADAPTER_SOURCE: &str = r#"() => { /* viewlint-adapter-install */
  const selectorPath = (el) => {
    if (!(el instanceof Element)) {
      throw new Error("viewlint: report target is not an element");
    }
    const segments = [];
    let node = el;
    while (node && node.nodeType === 1 && node !== document.documentElement) {
      if (node.id) {
        segments.unshift(`#${CSS.escape(node.id)}`);
        break;
      }
      const tag = node.tagName.toLowerCase();
      let nth = 1;
      let sibling = node;
      while ((sibling = sibling.previousElementSibling)) {
        if (sibling.tagName === node.tagName) nth += 1;
      }
      segments.unshift(`${tag}:nth-of-type(${nth})`);
      node = node.parentElement;
    }
    return segments.join(" > ") || "html";
  };
  const describe = (el) => {
    const generator = window.__viewlint && window.__viewlint.selectorPath;
    if (typeof generator !== "function") {
      throw new Error("viewlint: selector path generator missing");
    }
    return {
      selector: generator(el),
      tagName: el.tagName.toLowerCase(),
      id: el.id || null,
      classes: Array.from(el.classList),
    };
  };
  window.__viewlint = {
    selectorPath,
    describe,
    scope(markers) {
      const roots = () =>
        markers.flatMap((m) =>
          Array.from(document.querySelectorAll(`[data-viewlint-scope="${m}"]`))
        );
      return {
        roots,
        queryAll(selector) {
          const seen = new Set();
          const out = [];
          for (const root of roots()) {
            for (const el of root.querySelectorAll(selector)) {
              if (!seen.has(el)) {
                seen.add(el);
                out.push(el);
              }
            }
          }
          return out;
        },
      };
    },
    unbox(args, refs) {
      const revive = (value) => {
        if (Array.isArray(value)) return value.map(revive);
        if (value && typeof value === "object") {
          if (typeof value.__viewlintRef === "number") return refs[value.__viewlintRef];
          const out = {};
          for (const [key, entry] of Object.entries(value)) out[key] = revive(entry);
          return out;
        }
        return value;
      };
      return revive(args);
    },
    report(raw) {
      const payload = {
        message: String(raw.message),
        location: describe(raw.element),
        relations: (raw.relations || []).map((relation) => ({
          description: String(relation.description),
          location: describe(relation.element),
        })),
      };
      window.__viewlintReport(JSON.stringify(payload));
    },
  };
  return true;
}"#;

/// Wrap an element handle so it can travel inside evaluate args. The bridge
/// deep-unboxes these back into live in-page elements.
#[must_use]
pub fn element_arg(element: &ElementRef) -> Value {
    json!({ ELEMENT_KEY: element.object_id })
}

struct BufferState {
    /// Reports collected for the rule invocation currently in flight
    active: Option<Vec<viewlint_types::Violation>>,
    /// First protocol violation observed since the last `finish`
    protocol_error: Option<String>,
}

/// Executes rule logic inside the page and marshals violations back out.
///
/// One bridge per page. The report binding is installed lazily once (it
/// survives navigation); the adapter script is reinstalled whenever the page
/// content generation changes, because page script state does not survive
/// navigation.
pub struct EvaluationBridge {
    page: Arc<dyn Page>,
    buffer: Arc<Mutex<BufferState>>,
    binding_installed: AtomicBool,
    installed_generation: Mutex<Option<u64>>,
}

impl EvaluationBridge {
    #[must_use]
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self {
            page,
            buffer: Arc::new(Mutex::new(BufferState {
                active: None,
                protocol_error: None,
            })),
            binding_installed: AtomicBool::new(false),
            installed_generation: Mutex::new(None),
        }
    }

    /// Open the report buffer for one rule invocation.
    pub fn begin(&self, rule_id: &str) -> Result<(), LintError> {
        let mut state = self.buffer.lock();
        if state.active.is_some() {
            return Err(LintError::EvaluationProtocol(format!(
                "buffer for '{rule_id}' opened while another rule invocation is in flight"
            )));
        }
        state.active = Some(Vec::new());
        Ok(())
    }

    /// Close the active buffer and hand back everything reported into it.
    ///
    /// Surfaces any protocol violation observed while the buffer was open
    /// (or closed), rather than silently dropping data.
    pub fn finish(&self) -> Result<Vec<viewlint_types::Violation>, LintError> {
        let mut state = self.buffer.lock();
        if let Some(detail) = state.protocol_error.take() {
            state.active = None;
            return Err(LintError::EvaluationProtocol(detail));
        }
        state
            .active
            .take()
            .ok_or_else(|| LintError::EvaluationProtocol("finish without an active buffer".to_string()))
    }

    /// Host-side `report` passthrough for violations whose location is
    /// already known on this side of the boundary.
    pub fn report(&self, violation: viewlint_types::Violation) -> Result<(), LintError> {
        let mut state = self.buffer.lock();
        match state.active.as_mut() {
            Some(buffer) => {
                buffer.push(violation);
                Ok(())
            }
            None => Err(LintError::EvaluationProtocol(
                "report with no active rule invocation".to_string(),
            )),
        }
    }

    /// Run `source` (a `(ctx) => ...` function) inside the page with
    /// `{report, scope, args}` injected, and marshal its return value back.
    pub async fn evaluate(
        &self,
        scope: &ScopeSet,
        source: &str,
        args: Value,
    ) -> Result<Value, LintError> {
        self.ensure_installed().await?;
        if scope.generation() != self.page.generation() {
            return Err(LintError::EvaluationProtocol(format!(
                "scope resolved against generation {} but page is at {}; re-resolve after navigation or reset",
                scope.generation(),
                self.page.generation()
            )));
        }

        let (unboxed, refs) = lift_element_refs(args);
        let mut call_args = vec![
            CallArg::Json(json!(scope.markers())),
            CallArg::Json(unboxed),
        ];
        call_args.extend(refs.into_iter().map(CallArg::Element));

        let wrapped = format!(
            "(markers, args, ...refs) => {{\n\
             \x20 const vl = window.__viewlint;\n\
             \x20 if (!vl || typeof vl.selectorPath !== \"function\") {{\n\
             \x20   throw new Error(\"viewlint: page adapter missing\");\n\
             \x20 }}\n\
             \x20 const ctx = {{ report: vl.report, scope: vl.scope(markers), args: vl.unbox(args, refs) }};\n\
             \x20 return ({source})(ctx);\n\
             }}"
        );

        let result = self.page.call_function(&wrapped, call_args).await?;
        Ok(result)
    }

    /// Install the binding (once per page) and the adapter (once per content
    /// generation).
    async fn ensure_installed(&self) -> Result<(), LintError> {
        if !self.binding_installed.swap(true, Ordering::SeqCst) {
            let buffer = Arc::clone(&self.buffer);
            self.page
                .expose_binding(
                    REPORT_BINDING,
                    Arc::new(move |payload| ingest(&buffer, payload)),
                )
                .await?;
        }

        let generation = self.page.generation();
        if *self.installed_generation.lock() == Some(generation) {
            return Ok(());
        }

        tracing::debug!(generation, "installing page-side adapter");
        let installed = self.page.call_function(ADAPTER_SOURCE, Vec::new()).await?;
        if installed != Value::Bool(true) {
            return Err(LintError::EvaluationProtocol(
                "page-side adapter failed to install".to_string(),
            ));
        }
        *self.installed_generation.lock() = Some(generation);
        Ok(())
    }
}

/// Binding entry point: parse the payload and append it to the active
/// buffer. A report with no active buffer, or a malformed payload, is an
/// internal-invariant violation: record it so `finish` raises, and reject
/// the in-page call.
fn ingest(buffer: &Mutex<BufferState>, payload: Value) -> Result<(), DriverError> {
    let parsed: Result<viewlint_types::Violation, String> = match payload {
        // CDP bindings deliver strings; accept structured payloads too.
        Value::String(text) => serde_json::from_str(&text).map_err(|e| e.to_string()),
        other => serde_json::from_value(other).map_err(|e| e.to_string()),
    };

    let mut state = buffer.lock();
    let violation = match parsed {
        Ok(violation) => violation,
        Err(detail) => {
            let detail = format!("malformed report payload: {detail}");
            tracing::error!(%detail, "evaluation protocol violation");
            state.protocol_error.get_or_insert(detail.clone());
            return Err(DriverError::Protocol(detail));
        }
    };

    match state.active.as_mut() {
        Some(reports) => {
            reports.push(violation);
            Ok(())
        }
        None => {
            let detail = "report received with no active rule invocation".to_string();
            tracing::error!(%detail, "evaluation protocol violation");
            state.protocol_error.get_or_insert(detail.clone());
            Err(DriverError::Protocol(detail))
        }
    }
}

/// Replace nested element-handle markers with positional references,
/// returning the cleaned value and the reference table in order.
fn lift_element_refs(args: Value) -> (Value, Vec<ElementRef>) {
    fn walk(value: Value, refs: &mut Vec<ElementRef>) -> Value {
        match value {
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(object_id)) = map.get(ELEMENT_KEY) {
                        let index = refs.len();
                        refs.push(ElementRef::new(object_id.clone()));
                        return json!({ REF_KEY: index });
                    }
                }
                Value::Object(
                    map.into_iter()
                        .map(|(key, entry)| (key, walk(entry, refs)))
                        .collect(),
                )
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| walk(item, refs)).collect())
            }
            other => other,
        }
    }

    let mut refs = Vec::new();
    let cleaned = walk(args, &mut refs);
    (cleaned, refs)
}
