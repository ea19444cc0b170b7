//! Correlated assembler.
//!
//! The assembler resolves a virtual group into a document tree: it runs the
//! group's template, and for every produced row resolves each child group
//! with parameters bound from that row (or any further ancestor), attaching
//! the results under the row. Two strategies produce identical trees:
//!
//! - **Depth-first** issues one executor call per parent row and child
//!   group, recursing as soon as a row is available.
//! - **Batched** resolves one document level at a time: every parent row's
//!   parameter vector for a child group goes out in a single
//!   `execute_batch` call, so round trips grow with the number of groups
//!   rather than the number of rows.
//!
//! Row order is the executor's order; nothing is sorted or deduplicated.
//! Any failure aborts the whole assembly and no partial tree is returned.

mod config;
mod context;

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use tracing::{debug, trace, warn};

use crate::binder::{resolve_parameters, AncestorScope};
use crate::catalog::{Catalog, GroupDef};
use crate::document::{ChildCollection, DocumentNode};
use crate::error::{NestqlError, Result};
use crate::executor::RowExecutor;
use crate::template::QueryTemplate;
use crate::types::{Row, Value};

pub use config::{AssemblyConfig, AssemblyStrategy, DEFAULT_MAX_CONCURRENCY};
pub use context::{AssemblyStats, CancelHandle};

use context::AssemblyContext;

/// Assembles documents from a catalog by driving a row executor.
pub struct CorrelatedAssembler<'a> {
    catalog: &'a Catalog,
    executor: &'a dyn RowExecutor,
    config: AssemblyConfig,
    cancel: CancelHandle,
}

impl<'a> CorrelatedAssembler<'a> {
    /// Creates an assembler with the default configuration.
    #[must_use]
    pub fn new(catalog: &'a Catalog, executor: &'a dyn RowExecutor) -> Self {
        CorrelatedAssembler {
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

    /// Uses `cancel` to abort assemblies from elsewhere.
    #[must_use]
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the handle that cancels this assembler's work.
    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Returns the assembly configuration.
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Returns the strategy used against the current executor.
    #[must_use]
    pub fn strategy(&self) -> AssemblyStrategy {
        self.config.effective_strategy(self.executor.supports_batch())
    }

    /// Assembles the document rooted at an uncorrelated virtual group.
    ///
    /// The returned node is a synthetic root whose single child collection
    /// holds the rows of `root`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown group, `SchemaError` if the group
    /// is a leaf or nested under a parent, and `Assembly` wrapping any
    /// failure raised while resolving the tree.
    pub async fn assemble(&self, root: &str) -> Result<DocumentNode> {
        self.assemble_with_stats(root).await.map(|(doc, _)| doc)
    }

    /// Like [`Self::assemble`], also returning execution statistics.
    ///
    /// # Errors
    ///
    /// See [`Self::assemble`].
    pub async fn assemble_with_stats(&self, root: &str) -> Result<(DocumentNode, AssemblyStats)> {
        let group = self.catalog.lookup_group(root)?;
        if let Some(parent) = group.parent() {
            return Err(NestqlError::SchemaError(format!(
                "Group '{root}' is nested under '{parent}' and needs enclosing rows"
            )));
        }
        self.assemble_in_scope(group, AncestorScope::new()).await
    }

    /// Assembles a nested group for caller-supplied enclosing rows.
    ///
    /// `outer_rows` holds one row per ancestor of `group`, outermost first.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the number of rows differs from the
    /// group's nesting depth and `BindingResolutionError` if a row does not
    /// match its ancestor's shape, plus the errors of [`Self::assemble`].
    pub async fn assemble_correlated(
        &self,
        group: &str,
        outer_rows: Vec<Row>,
    ) -> Result<DocumentNode> {
        let group = self.catalog.lookup_group(group)?;
        let mut ancestors = self.catalog.ancestors_of(group.name());
        ancestors.reverse();

        if ancestors.len() != outer_rows.len() {
            return Err(NestqlError::SchemaError(format!(
                "Group '{}' is nested {} level(s) deep but {} enclosing row(s) were supplied",
                group.name(),
                ancestors.len(),
                outer_rows.len()
            )));
        }

        let mut scope = AncestorScope::new();
        for (ancestor, row) in ancestors.into_iter().zip(outer_rows) {
            let row = checked_row(&ancestor, row)?;
            scope = scope.child(ancestor, row);
        }

        self.assemble_in_scope(group, scope).await.map(|(doc, _)| doc)
    }

    async fn assemble_in_scope(
        &self,
        group: Arc<GroupDef>,
        scope: AncestorScope,
    ) -> Result<(DocumentNode, AssemblyStats)> {
        let strategy = self.strategy();
        let ctx = AssemblyContext::new(self.cancel.clone(), self.config.row_limit);
        let path = scope.path();

        debug!(group = group.name(), ?strategy, depth = path.len(), "assembling document");

        let result = match strategy {
            AssemblyStrategy::Batched => self
                .resolve_level(&ctx, Arc::clone(&group), vec![scope], path)
                .await
                .map(|mut levels| levels.pop().unwrap_or_default()),
            AssemblyStrategy::DepthFirst | AssemblyStrategy::Auto => {
                self.resolve_group(&ctx, Arc::clone(&group), scope, path).await
            }
        };

        match result {
            Ok(nodes) => {
                let stats = ctx.stats();
                debug!(
                    group = group.name(),
                    rows = stats.rows,
                    executor_calls = stats.executor_calls,
                    "assembled document"
                );
                Ok((DocumentNode::root(ChildCollection::new(group, nodes)), stats))
            }
            Err(err) => {
                warn!(group = group.name(), error = %err, "assembly failed");
                Err(err)
            }
        }
    }

    /// Depth-first resolution of `group` within one enclosing scope.
    fn resolve_group<'s>(
        &'s self,
        ctx: &'s AssemblyContext,
        group: Arc<GroupDef>,
        scope: AncestorScope,
        path: Vec<String>,
    ) -> BoxFuture<'s, Result<Vec<DocumentNode>>> {
        async move {
            let at = |e: NestqlError| e.at(group.name(), &path);

            let template = prepare(ctx, &group, &path).map_err(at)?;
            let params = resolve_parameters(&template, &scope).map_err(at)?;
            let rows = self.execute(ctx, &template, &params).await.map_err(at)?;
            ctx.add_rows(rows.len()).map_err(at)?;

            let children = self.catalog.child_groups_of(group.name());
            let mut child_path = path.clone();
            child_path.push(group.name().to_string());

            let mut nodes = Vec::with_capacity(rows.len());
            for row in rows {
                let row = checked_row(&group, row).map_err(at)?;
                let row_scope = scope.child(Arc::clone(&group), Arc::clone(&row));

                let pending: Vec<_> = children
                    .iter()
                    .map(|child| {
                        let child = Arc::clone(child);
                        self.resolve_group(
                            ctx,
                            Arc::clone(&child),
                            row_scope.clone(),
                            child_path.clone(),
                        )
                        .map(move |nodes| nodes.map(|nodes| ChildCollection::new(child, nodes)))
                    })
                    .collect();
                let collections = stream::iter(pending)
                    .buffered(self.config.max_concurrency.max(1))
                    .try_collect::<Vec<_>>()
                    .await?;

                nodes.push(DocumentNode::new(Arc::clone(&group), row, collections));
            }
            Ok(nodes)
        }
        .boxed()
    }

    /// Level-at-a-time resolution of `group` for every scope in `scopes`.
    ///
    /// The result holds one node list per input scope, in input order.
    fn resolve_level<'s>(
        &'s self,
        ctx: &'s AssemblyContext,
        group: Arc<GroupDef>,
        scopes: Vec<AncestorScope>,
        path: Vec<String>,
    ) -> BoxFuture<'s, Result<Vec<Vec<DocumentNode>>>> {
        async move {
            let at = |e: NestqlError| e.at(group.name(), &path);

            let template = prepare(ctx, &group, &path).map_err(at)?;
            if scopes.is_empty() {
                return Ok(Vec::new());
            }

            let param_sets = scopes
                .iter()
                .map(|scope| resolve_parameters(&template, scope))
                .collect::<Result<Vec<_>>>()
                .map_err(at)?;
            let row_sets = self
                .execute_level(ctx, &template, &param_sets)
                .await
                .map_err(at)?;

            // Flatten the produced rows, remembering which scope owns each.
            let mut owners = Vec::new();
            let mut rows = Vec::new();
            let mut row_scopes = Vec::new();
            for (owner, (scope, produced)) in scopes.iter().zip(row_sets).enumerate() {
                ctx.add_rows(produced.len()).map_err(at)?;
                for row in produced {
                    let row = checked_row(&group, row).map_err(at)?;
                    row_scopes.push(scope.child(Arc::clone(&group), Arc::clone(&row)));
                    rows.push(row);
                    owners.push(owner);
                }
            }

            let children = self.catalog.child_groups_of(group.name());
            let mut child_path = path.clone();
            child_path.push(group.name().to_string());

            let pending: Vec<_> = children
                .iter()
                .map(|child| {
                    self.resolve_level(ctx, Arc::clone(child), row_scopes.clone(), child_path.clone())
                })
                .collect();
            let child_levels = stream::iter(pending)
                .buffered(self.config.max_concurrency.max(1))
                .try_collect::<Vec<_>>()
                .await?;

            let mut child_nodes: Vec<_> = child_levels.into_iter().map(Vec::into_iter).collect();
            let mut grouped: Vec<Vec<DocumentNode>> = scopes.iter().map(|_| Vec::new()).collect();
            for (row, owner) in rows.into_iter().zip(owners) {
                let collections = children
                    .iter()
                    .zip(child_nodes.iter_mut())
                    .map(|(child, nodes)| {
                        ChildCollection::new(Arc::clone(child), nodes.next().unwrap_or_default())
                    })
                    .collect();
                grouped[owner].push(DocumentNode::new(Arc::clone(&group), row, collections));
            }
            Ok(grouped)
        }
        .boxed()
    }

    async fn execute(
        &self,
        ctx: &AssemblyContext,
        template: &QueryTemplate,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        ctx.check_cancelled()?;
        trace!(query = template.query(), parameters = params.len(), "executing query");
        ctx.record_call(1, false);
        self.executor.execute(template.query(), params).await
    }

    async fn execute_level(
        &self,
        ctx: &AssemblyContext,
        template: &QueryTemplate,
        param_sets: &[Vec<Value>],
    ) -> Result<Vec<Vec<Row>>> {
        if param_sets.len() == 1 || !self.executor.supports_batch() {
            let mut results = Vec::with_capacity(param_sets.len());
            for params in param_sets {
                results.push(self.execute(ctx, template, params).await?);
            }
            return Ok(results);
        }

        ctx.check_cancelled()?;
        trace!(
            query = template.query(),
            vectors = param_sets.len(),
            "executing batched query"
        );
        ctx.record_call(param_sets.len(), true);
        let results = self
            .executor
            .execute_batch(template.query(), param_sets)
            .await?;

        if results.len() != param_sets.len() {
            return Err(NestqlError::ExecutionError(format!(
                "batch returned {} result set(s) for {} parameter vector(s)",
                results.len(),
                param_sets.len()
            )));
        }
        Ok(results)
    }
}

/// Checks cancellation and the resolution path, then returns the group's
/// template.
fn prepare(ctx: &AssemblyContext, group: &GroupDef, path: &[String]) -> Result<Arc<QueryTemplate>> {
    ctx.check_cancelled()?;

    if path.iter().any(|g| g == group.name()) {
        let mut cycle = path.to_vec();
        cycle.push(group.name().to_string());
        return Err(NestqlError::CyclicDependency { path: cycle });
    }

    group.template().cloned().ok_or_else(|| {
        NestqlError::SchemaError(format!(
            "Group '{}' is not virtual and cannot be assembled",
            group.name()
        ))
    })
}

/// Verifies that an executor row matches the shape of its group.
fn checked_row(group: &GroupDef, row: Row) -> Result<Arc<Row>> {
    if row.len() != group.arity() {
        return Err(NestqlError::BindingResolutionError(format!(
            "row of '{}' has {} value(s), expected {}",
            group.name(),
            row.len(),
            group.arity()
        )));
    }
    Ok(Arc::new(row))
}
