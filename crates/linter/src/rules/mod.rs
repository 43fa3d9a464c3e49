//! Built-in lint rules.
//!
//! These are deliberately plain DOM checks: each runs a script inside the
//! page's scope surface and reports through the bridge. The interesting
//! geometric and pixel heuristics live in external plugins.

mod duplicate_id;
mod image_alt;

pub use duplicate_id::DuplicateIdRule;
pub use image_alt::ImageAltRule;
