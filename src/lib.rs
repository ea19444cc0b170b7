//! nestql - correlated virtual-group resolution
//!
//! A catalog defines *virtual groups*: relations whose rows come from a
//! templated query rather than storage. A group's template may bind
//! parameters to elements of enclosing groups, which nests it under them.
//! Assembling a root group runs its query, then resolves every nested group
//! for every produced row, yielding a hierarchical [`DocumentNode`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use nestql::catalog::{Catalog, ElementDef, GroupDefinition};
//! use nestql::executor::InMemoryExecutor;
//! use nestql::template::{Binding, TemplateDef};
//! use nestql::types::{DataType, Value};
//! use nestql::{row, DocumentEngine};
//!
//! let items = GroupDefinition::virtual_group(
//!     "items",
//!     vec![ElementDef::new("itemNum", DataType::Int64).unwrap()],
//!     TemplateDef::uncorrelated("SELECT itemNum FROM items"),
//! )
//! .unwrap();
//! let suppliers = GroupDefinition::virtual_group(
//!     "suppliers",
//!     vec![ElementDef::new("supplierName", DataType::String).unwrap()],
//!     TemplateDef::new(
//!         "SELECT supplierName FROM suppliers WHERE itemNum = ?",
//!         vec![Binding::new("items.itemNum")],
//!     ),
//! )
//! .unwrap();
//! let catalog = Catalog::from_definitions(vec![items, suppliers]).unwrap();
//!
//! let executor = InMemoryExecutor::new()
//!     .with_rows("SELECT itemNum FROM items", vec![], vec![row![1]])
//!     .with_rows(
//!         "SELECT supplierName FROM suppliers WHERE itemNum = ?",
//!         vec![Value::from(1)],
//!         vec![row!["Acme"]],
//!     );
//!
//! let engine = DocumentEngine::new(Arc::new(catalog), Arc::new(executor));
//! let doc = engine.assemble_blocking("items").unwrap();
//! let item = &doc.children("items").unwrap()[0];
//! assert_eq!(item.children("suppliers").unwrap()[0].value("supplierName"), Some(&Value::from("Acme")));
//! ```

pub mod assembler;
pub mod binder;
pub mod catalog;
pub mod document;
pub mod error;
pub mod executor;
pub mod template;
pub mod types;

use std::sync::Arc;

pub use assembler::{AssemblyConfig, AssemblyStats, AssemblyStrategy, CancelHandle, CorrelatedAssembler};
pub use document::{DocumentNode, XmlWriter};
pub use error::{NestqlError, Result};
pub use types::{Row, Value};

use catalog::Catalog;
use executor::RowExecutor;

/// Owns a catalog and an executor and assembles documents from them.
///
/// The catalog is immutable once built and shared by every assembly; an
/// engine can serve concurrent assemblies as long as its executor can.
#[derive(Clone)]
pub struct DocumentEngine {
    /// Schema catalog.
    catalog: Arc<Catalog>,
    /// Row executor collaborator.
    executor: Arc<dyn RowExecutor>,
    /// Assembly configuration.
    config: AssemblyConfig,
    /// Cancels every assembly started by this engine.
    cancel: CancelHandle,
}

impl DocumentEngine {
    /// Creates an engine with the default assembly configuration.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, executor: Arc<dyn RowExecutor>) -> Self {
        Self {
            catalog,
            executor,
            config: AssemblyConfig::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Sets the assembly configuration.
    #[must_use]
    pub fn with_config(mut self, config: AssemblyConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the assembly configuration.
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Returns the handle that cancels this engine's assemblies.
    ///
    /// Cancellation is permanent; clones of the engine share the handle.
    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Returns an assembler borrowing this engine's catalog and executor.
    #[must_use]
    pub fn assembler(&self) -> CorrelatedAssembler<'_> {
        CorrelatedAssembler::new(&self.catalog, self.executor.as_ref())
            .with_config(self.config.clone())
            .with_cancel_handle(self.cancel.clone())
    }

    /// Assembles the document rooted at `root`.
    ///
    /// # Errors
    ///
    /// See [`CorrelatedAssembler::assemble`].
    pub async fn assemble(&self, root: &str) -> Result<DocumentNode> {
        self.assembler().assemble(root).await
    }

    /// Like [`Self::assemble`], also returning execution statistics.
    ///
    /// # Errors
    ///
    /// See [`CorrelatedAssembler::assemble`].
    pub async fn assemble_with_stats(&self, root: &str) -> Result<(DocumentNode, AssemblyStats)> {
        self.assembler().assemble_with_stats(root).await
    }

    /// Assembles the document rooted at `root` on a private current-thread
    /// runtime.
    ///
    /// Must not be called from within an async runtime.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if the runtime cannot be started, otherwise
    /// as [`CorrelatedAssembler::assemble`].
    pub fn assemble_blocking(&self, root: &str) -> Result<DocumentNode> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| NestqlError::ExecutionError(format!("Failed to start runtime: {e}")))?;
        runtime.block_on(self.assemble(root))
    }

    /// Assembles `root` and renders it as XML inside `root_tag`.
    ///
    /// # Errors
    ///
    /// Returns assembly errors, or `SerializationError` if rendering fails.
    pub async fn assemble_xml(&self, root: &str, root_tag: &str) -> Result<String> {
        let doc = self.assemble(root).await?;
        XmlWriter::render(&doc, root_tag)
    }
}
