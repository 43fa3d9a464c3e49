//! Scope stabilization across the host/page boundary.
//!
//! A selector computed once may not re-resolve to the same element when
//! queried independently from the two sides of the execution boundary. The
//! stabilizer therefore tags every resolved root with a generated marker
//! attribute; from then on both sides address "the same" root by querying
//! that marker, which guarantees referential equivalence. Markers survive
//! in-place DOM mutation but not a full navigation or reset, so a fresh
//! resolve is mandatory after every content generation change.

use crate::config::ResolvedConfiguration;
use crate::error::LintError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use viewlint_driver::{ElementRef, Page, ScopeProvider};

/// Attribute carrying the generated root marker.
pub const SCOPE_MARKER_ATTR: &str = "data-viewlint-scope";

/// Selector for the default root when a target has no scope spec.
const DEFAULT_ROOT_SELECTOR: &str = "body";

/// One scope definition inside the named-scope registry.
#[derive(Clone)]
pub enum ScopeDef {
    /// A CSS selector evaluated on the page
    Selector(String),
    /// An external locator capability
    Provider(Arc<dyn ScopeProvider>),
}

/// A target's scope spec: zero or more descriptors. Empty means "the page's
/// top-level content container".
#[derive(Clone, Default)]
pub struct ScopeSpec {
    items: Vec<ScopeItem>,
}

#[derive(Clone)]
enum ScopeItem {
    Named(String),
    Def(ScopeDef),
}

impl ScopeSpec {
    /// No explicit scope; resolution falls back to the default container.
    #[must_use]
    pub fn page() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::default().and_selector(selector)
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::default().and_named(name)
    }

    #[must_use]
    pub fn and_selector(mut self, selector: impl Into<String>) -> Self {
        self.items.push(ScopeItem::Def(ScopeDef::Selector(selector.into())));
        self
    }

    #[must_use]
    pub fn and_named(mut self, name: impl Into<String>) -> Self {
        self.items.push(ScopeItem::Named(name.into()));
        self
    }

    #[must_use]
    pub fn and_provider(mut self, provider: Arc<dyn ScopeProvider>) -> Self {
        self.items.push(ScopeItem::Def(ScopeDef::Provider(provider)));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Human-readable description for scope resolution errors.
    fn describe(&self) -> String {
        if self.items.is_empty() {
            return format!("default container '{DEFAULT_ROOT_SELECTOR}'");
        }
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|item| match item {
                ScopeItem::Named(name) => format!("scope '{name}'"),
                ScopeItem::Def(ScopeDef::Selector(selector)) => format!("selector '{selector}'"),
                ScopeItem::Def(ScopeDef::Provider(_)) => "custom locator".to_string(),
            })
            .collect();
        parts.join(", ")
    }
}

/// One stabilized root region.
#[derive(Debug, Clone)]
pub struct ScopeRoot {
    /// Marker value, unique within one page content generation
    pub marker: String,
    /// Host-side handle to the marked element
    pub element: ElementRef,
}

/// The resolved root set for one page content generation.
#[derive(Debug, Clone)]
pub struct ScopeSet {
    roots: Vec<ScopeRoot>,
    generation: u64,
}

impl ScopeSet {
    #[must_use]
    pub fn roots(&self) -> &[ScopeRoot] {
        &self.roots
    }

    /// Marker values, the identity shared with the page side.
    #[must_use]
    pub fn markers(&self) -> Vec<&str> {
        self.roots.iter().map(|root| root.marker.as_str()).collect()
    }

    /// Page content generation this set was resolved against.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Resolves scope specs into marker-stabilized root sets.
pub struct ScopeStabilizer {
    sequence: AtomicU64,
}

impl Default for ScopeStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStabilizer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    /// Resolve `spec` into a root set for the page's current content
    /// generation. Roots already carrying a marker keep it; new roots get a
    /// freshly generated one. Duplicated candidates collapse by marker.
    #[tracing::instrument(skip_all, fields(generation = page.generation()))]
    pub async fn resolve(
        &self,
        page: &dyn Page,
        config: &ResolvedConfiguration,
        spec: &ScopeSpec,
        options: &Value,
    ) -> Result<ScopeSet, LintError> {
        let generation = page.generation();
        let candidates = gather(page, config, spec, options).await?;
        if candidates.is_empty() {
            return Err(LintError::ScopeResolution(format!(
                "no elements matched {}",
                spec.describe()
            )));
        }

        let mut seen = BTreeSet::new();
        let mut roots = Vec::new();
        for element in candidates {
            let marker = match page.get_attribute(&element, SCOPE_MARKER_ATTR).await? {
                Some(existing) => existing,
                None => {
                    let marker = format!(
                        "vl{generation}-{}",
                        self.sequence.fetch_add(1, Ordering::Relaxed)
                    );
                    page.set_attribute(&element, SCOPE_MARKER_ATTR, &marker).await?;
                    marker
                }
            };
            if seen.insert(marker.clone()) {
                roots.push(ScopeRoot { marker, element });
            }
        }

        tracing::debug!(roots = roots.len(), "scope resolved");
        Ok(ScopeSet { roots, generation })
    }
}

/// Gather candidate root elements for `spec`, in declaration order.
async fn gather(
    page: &dyn Page,
    config: &ResolvedConfiguration,
    spec: &ScopeSpec,
    options: &Value,
) -> Result<Vec<ElementRef>, LintError> {
    if spec.is_empty() {
        return Ok(page.query_selector_all(DEFAULT_ROOT_SELECTOR).await?);
    }

    let mut candidates = Vec::new();
    for item in &spec.items {
        match item {
            ScopeItem::Named(name) => {
                let defs = config.scope(name).ok_or_else(|| LintError::UnknownScope {
                    name: name.clone(),
                    known: config.known_scopes(),
                })?;
                for def in defs {
                    candidates.extend(locate(page, def, options).await?);
                }
            }
            ScopeItem::Def(def) => candidates.extend(locate(page, def, options).await?),
        }
    }
    Ok(candidates)
}

async fn locate(
    page: &dyn Page,
    def: &ScopeDef,
    options: &Value,
) -> Result<Vec<ElementRef>, LintError> {
    match def {
        ScopeDef::Selector(selector) => Ok(page.query_selector_all(selector).await?),
        ScopeDef::Provider(provider) => Ok(provider.locate(page, options).await?),
    }
}
