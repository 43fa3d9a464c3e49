//! Fake `View` producing in-memory page sessions.

use crate::dom::FakeDom;
use crate::page::{FakePage, Invocation, ScriptHandler};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viewlint_driver::{DriverError, Page, View, ViewSession};

type DomFactory = Arc<dyn Fn() -> FakeDom + Send + Sync>;

struct ViewState {
    factory: DomFactory,
    scripts: Mutex<Vec<(String, ScriptHandler)>>,
    setups: Mutex<Vec<Value>>,
    resets: AtomicUsize,
    closes: AtomicUsize,
}

/// A [`View`] whose sessions run on [`FakePage`]s.
///
/// Every `setup` builds a fresh document from the factory closure; `reset`
/// rebuilds it (bumping the page generation), which is exactly the pristine
/// state contract the engine relies on after side-effecting rules.
#[derive(Clone)]
pub struct FakeView {
    state: Arc<ViewState>,
}

impl FakeView {
    pub fn new(factory: impl Fn() -> FakeDom + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(ViewState {
                factory: Arc::new(factory),
                scripts: Mutex::new(Vec::new()),
                setups: Mutex::new(Vec::new()),
                resets: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a script handler copied onto every page this view produces.
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

    /// Option payloads passed to `setup`, in call order.
    #[must_use]
    pub fn setup_options(&self) -> Vec<Value> {
        self.state.setups.lock().clone()
    }

    /// How many sessions have been reset.
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.state.resets.load(Ordering::SeqCst)
    }

    /// How many sessions have been closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl View for FakeView {
    async fn setup(&self, options: Value) -> Result<Box<dyn ViewSession>, DriverError> {
        self.state.setups.lock().push(options.clone());
        let page = FakePage::new((self.state.factory)());
        if let Some(url) = options.get("url").and_then(Value::as_str) {
            page.set_url(url);
        }
        for (pattern, handler) in self.state.scripts.lock().iter() {
            page.add_script(pattern.clone(), Arc::clone(handler));
        }
        Ok(Box::new(FakeSession {
            page,
            view: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    page: FakePage,
    view: Arc<ViewState>,
}

#[async_trait]
impl ViewSession for FakeSession {
    fn page(&self) -> Arc<dyn Page> {
        Arc::new(self.page.clone())
    }

    async fn reset(&mut self) -> Result<(), DriverError> {
        self.view.resets.fetch_add(1, Ordering::SeqCst);
        self.page.replace_dom((self.view.factory)());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.view.closes.fetch_add(1, Ordering::SeqCst);
        self.page.mark_closed();
        Ok(())
    }
}
