//! Catalog of leaf and virtual group definitions.

mod graph;
mod registry;
mod schema;

pub use graph::DependencyGraph;
pub use registry::{Catalog, CatalogBuilder, ElementRef};
pub use schema::{ElementDef, GroupDef, GroupDefinition, GroupKind};
