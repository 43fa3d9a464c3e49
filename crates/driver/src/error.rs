//! Driver error types.

use thiserror::Error;

/// Errors surfaced by a page automation implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// An evaluated script threw inside the page.
    #[error("Script error: {0}")]
    Script(String),

    /// An element handle referred to a previous content generation.
    #[error("Stale element handle: {0}")]
    StaleHandle(String),

    /// Element not found.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The page or its owning context has been closed.
    #[error("Page closed")]
    Closed,

    /// The implementation violated the driver protocol.
    #[error("Driver protocol error: {0}")]
    Protocol(String),

    /// Serialization of a marshaled value failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
