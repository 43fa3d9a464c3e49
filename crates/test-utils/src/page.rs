//! Fake `Page` implementation over a [`FakeDom`].

use crate::dom::{FakeDom, NodeId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use viewlint_driver::{BindingHandler, CallArg, DriverError, ElementRef, Page};

/// A script invocation handed to a registered handler.
pub struct Invocation<'a> {
    /// The full function source the engine evaluated
    pub function: &'a str,
    /// Marshaled arguments, in order
    pub args: &'a [CallArg],
    bindings: Vec<(String, BindingHandler)>,
}

impl Invocation<'_> {
    /// Invoke an exposed binding the way page script would.
    pub fn call_binding(&self, name: &str, payload: Value) -> Result<(), DriverError> {
        let handler = self
            .bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| Arc::clone(h))
            .ok_or_else(|| DriverError::Protocol(format!("no binding named '{name}'")))?;
        handler(payload)
    }

    /// The `i`-th argument if it is a JSON value.
    #[must_use]
    pub fn json_arg(&self, i: usize) -> Option<&Value> {
        match self.args.get(i) {
            Some(CallArg::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// The `i`-th argument if it is an element handle.
    #[must_use]
    pub fn element_arg(&self, i: usize) -> Option<&ElementRef> {
        match self.args.get(i) {
            Some(CallArg::Element(element)) => Some(element),
            _ => None,
        }
    }
}

/// Handler simulating one piece of in-page script. Returns the value the
/// evaluation would produce, or an error string that surfaces as a script
/// exception.
pub type ScriptHandler =
    Arc<dyn Fn(&mut FakeDom, &Invocation<'_>) -> Result<Value, String> + Send + Sync>;

struct PageState {
    dom: Mutex<FakeDom>,
    url: Mutex<String>,
    generation: AtomicU64,
    closed: AtomicBool,
    bindings: Mutex<Vec<(String, BindingHandler)>>,
    scripts: Mutex<Vec<(String, ScriptHandler)>>,
}

/// In-memory [`Page`]: queries and attribute operations hit the DOM
/// directly; `call_function` dispatches to registered script handlers,
/// matched by substring against the function source. Later registrations
/// win. An unmatched script evaluates to `null`.
#[derive(Clone)]
pub struct FakePage {
    state: Arc<PageState>,
}

impl FakePage {
    #[must_use]
    pub fn new(dom: FakeDom) -> Self {
        Self {
            state: Arc::new(PageState {
                dom: Mutex::new(dom),
                url: Mutex::new("about:blank".to_string()),
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                bindings: Mutex::new(Vec::new()),
                scripts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a script handler matched by `pattern` (substring of the
    /// evaluated function source).
    pub fn on_script(
        &self,
        pattern: impl Into<String>,
        handler: impl Fn(&mut FakeDom, &Invocation<'_>) -> Result<Value, String>
            + Send
            + Sync
            + 'static,
    ) {
        self.state
            .scripts
            .lock()
            .push((pattern.into(), Arc::new(handler)));
    }

    pub(crate) fn add_script(&self, pattern: String, handler: ScriptHandler) {
        self.state.scripts.lock().push((pattern, handler));
    }

    pub fn set_url(&self, url: impl Into<String>) {
        *self.state.url.lock() = url.into();
    }

    /// Replace the document and invalidate all element handles.
    pub fn replace_dom(&self, dom: FakeDom) {
        *self.state.dom.lock() = dom;
        self.state.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Mutate the current document in place (no generation bump, matching
    /// in-place DOM mutation on a real page).
    pub fn mutate_dom(&self, f: impl FnOnce(&mut FakeDom)) {
        f(&mut self.state.dom.lock());
    }

    /// Read the current document.
    pub fn with_dom<R>(&self, f: impl FnOnce(&FakeDom) -> R) -> R {
        f(&self.state.dom.lock())
    }

    pub(crate) fn mark_closed(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Invoke an exposed binding directly, as if page script called it
    /// outside any evaluation.
    pub fn trigger_binding(&self, name: &str, payload: Value) -> Result<(), DriverError> {
        let handler = {
            let bindings = self.state.bindings.lock();
            bindings
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, h)| Arc::clone(h))
        };
        let handler =
            handler.ok_or_else(|| DriverError::Protocol(format!("no binding named '{name}'")))?;
        handler(payload)
    }

    /// Element handle for a DOM node, valid for the current generation.
    #[must_use]
    pub fn element_ref(&self, node: NodeId) -> ElementRef {
        ElementRef::new(format!("e{node}@g{}", self.generation()))
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    fn resolve(&self, element: &ElementRef) -> Result<NodeId, DriverError> {
        let id = &element.object_id;
        let (node, generation) = id
            .strip_prefix('e')
            .and_then(|rest| rest.split_once("@g"))
            .and_then(|(n, g)| Some((n.parse::<usize>().ok()?, g.parse::<u64>().ok()?)))
            .ok_or_else(|| DriverError::Protocol(format!("malformed handle '{id}'")))?;
        if generation != self.generation() {
            return Err(DriverError::StaleHandle(id.clone()));
        }
        if node >= self.state.dom.lock().len() {
            return Err(DriverError::ElementNotFound(id.clone()));
        }
        Ok(node)
    }
}

#[async_trait]
impl Page for FakePage {
    async fn call_function(
        &self,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<Value, DriverError> {
        self.ensure_open()?;
        let handler = {
            let scripts = self.state.scripts.lock();
            scripts
                .iter()
                .rev()
                .find(|(pattern, _)| function.contains(pattern.as_str()))
                .map(|(_, handler)| Arc::clone(handler))
        };
        let Some(handler) = handler else {
            return Ok(Value::Null);
        };
        let bindings = self.state.bindings.lock().clone();
        let invocation = Invocation {
            function,
            args: &args,
            bindings,
        };
        let mut dom = self.state.dom.lock();
        handler(&mut dom, &invocation).map_err(DriverError::Script)
    }

    async fn expose_binding(
        &self,
        name: &str,
        handler: BindingHandler,
    ) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut bindings = self.state.bindings.lock();
        if bindings.iter().any(|(n, _)| n == name) {
            return Err(DriverError::Protocol(format!(
                "binding '{name}' already exposed"
            )));
        }
        bindings.push((name.to_string(), handler));
        Ok(())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        self.ensure_open()?;
        let nodes = self.state.dom.lock().query(selector);
        Ok(nodes.into_iter().map(|n| self.element_ref(n)).collect())
    }

    async fn get_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.ensure_open()?;
        let node = self.resolve(element)?;
        Ok(self
            .state
            .dom
            .lock()
            .attr(node, name)
            .map(ToString::to_string))
    }

    async fn set_attribute(
        &self,
        element: &ElementRef,
        name: &str,
        value: &str,
    ) -> Result<(), DriverError> {
        self.ensure_open()?;
        let node = self.resolve(element)?;
        self.state.dom.lock().set_attr(node, name, value);
        Ok(())
    }

    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>, DriverError> {
        self.ensure_open()?;
        let node = self.resolve(element)?;
        let parent = self.state.dom.lock().parent(node);
        Ok(parent.map(|p| self.element_ref(p)))
    }

    async fn url(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.state.url.lock().clone())
    }

    fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::SeqCst)
    }
}
