//! Foundation types for viewlint.
//!
//! This crate provides the shared vocabulary used across the viewlint stack.
//! It depends only on serde, making it suitable as a foundation layer.
//!
//! # Type Categories
//!
//! - **Severity**: [`Severity`]
//! - **Location types**: [`ElementLocation`], [`Relation`]
//! - **Report types**: [`Violation`], [`LintMessage`], [`LintResult`]

mod message;
mod result;
mod severity;

pub use message::{ElementLocation, LintMessage, Relation, Violation};
pub use result::LintResult;
pub use severity::Severity;
