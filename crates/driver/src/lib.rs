//! Page automation capability traits for viewlint.
//!
//! The engine never talks to a browser directly. It consumes the traits in
//! this crate: a [`View`] prepares a page into a lintable state, a [`Page`]
//! exposes the handful of operations the engine needs (remote function calls
//! with typed arguments, bindings, attribute and structure queries), and a
//! [`ScopeProvider`] locates candidate scope roots. Concrete implementations
//! (CDP, Playwright-over-CDP, an in-memory fake) live elsewhere.

mod error;
mod page;
mod view;

pub use error::DriverError;
pub use page::{BindingHandler, CallArg, ElementRef, Page};
pub use view::{ScopeProvider, View, ViewSession};
