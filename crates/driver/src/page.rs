//! The page capability.

use crate::DriverError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Opaque handle to an element living inside a page.
///
/// Handles are only valid within one page content generation; a full
/// navigation or reload invalidates them. Implementations typically wrap a
/// remote object id (CDP `objectId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub object_id: String,
}

impl ElementRef {
    #[must_use]
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
        }
    }
}

/// One argument of a remote function call.
///
/// Mirrors the two argument forms of CDP `Runtime.callFunctionOn`: plain
/// JSON values travel by value, element handles travel by reference and
/// arrive in the page as live elements.
#[derive(Debug, Clone)]
pub enum CallArg {
    Json(Value),
    Element(ElementRef),
}

/// Host-side callback installed into the page under a global name.
///
/// The page invokes it with a single JSON payload. Returning an error makes
/// the in-page call reject.
pub type BindingHandler = Arc<dyn Fn(Value) -> Result<(), DriverError> + Send + Sync>;

/// A single rendered page, owned by one lint target at a time.
///
/// All operations are sequential: implementations may assume no two calls
/// run concurrently against the same page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Call a function source (`(a, b) => ...`) inside the page's script
    /// context and marshal its return value back by value.
    async fn call_function(&self, function: &str, args: Vec<CallArg>)
        -> Result<Value, DriverError>;

    /// Install a persistent host-side callback reachable from page script
    /// under `name`. Bindings survive navigation.
    async fn expose_binding(&self, name: &str, handler: BindingHandler)
        -> Result<(), DriverError>;

    /// Query elements matching a CSS selector.
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, DriverError>;

    async fn get_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn set_attribute(
        &self,
        element: &ElementRef,
        name: &str,
        value: &str,
    ) -> Result<(), DriverError>;

    /// Parent element, or `None` at the top of the tree.
    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>, DriverError>;

    /// Current page URL.
    async fn url(&self) -> Result<String, DriverError>;

    /// Content generation counter.
    ///
    /// Increments on every full navigation, reload, or reset. Element handles
    /// and page-side script state from earlier generations are invalid.
    fn generation(&self) -> u64;
}
