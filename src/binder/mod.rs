//! Binding resolution.
//!
//! The binder turns the compiled parameter slots of a query template into
//! concrete parameter values for one position in the document:
//! - an [`AncestorScope`] records the rows enclosing that position
//! - [`resolve_binding`] reads and coerces a single bound value
//! - [`resolve_parameters`] builds the full parameter vector

mod resolver;
mod scope;

pub use resolver::{resolve_binding, resolve_parameters};
pub use scope::{AncestorScope, ScopeFrame};
