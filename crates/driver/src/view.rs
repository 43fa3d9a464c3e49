//! Views and scope providers.

use crate::{DriverError, ElementRef, Page};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// External capability that prepares a page into a lintable state.
///
/// `setup` receives the target's merged option layers and must hand back an
/// exclusive session. What "setup" means is the view's business: navigating
/// to a URL, logging in, opening a dialog, seeding fixtures.
#[async_trait]
pub trait View: Send + Sync {
    async fn setup(&self, options: Value) -> Result<Box<dyn ViewSession>, DriverError>;
}

/// An exclusive page session produced by [`View::setup`].
#[async_trait]
pub trait ViewSession: Send + Sync {
    /// The page this session owns.
    fn page(&self) -> Arc<dyn Page>;

    /// Restore the page to the pristine state `setup` left it in.
    ///
    /// Bumps the page's content generation; handles and page-side script
    /// state from before the reset are invalid afterwards.
    async fn reset(&mut self) -> Result<(), DriverError>;

    /// Release the page. Must be safe to call after failures.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Locates candidate scope root elements for a target.
///
/// `options` is the target's merged option layers, so a provider can pick
/// roots differently per configuration.
#[async_trait]
pub trait ScopeProvider: Send + Sync {
    async fn locate(
        &self,
        page: &dyn Page,
        options: &Value,
    ) -> Result<Vec<ElementRef>, DriverError>;
}
