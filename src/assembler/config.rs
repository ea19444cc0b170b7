//! Assembly configuration.

/// Default number of sibling groups resolved concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// How child groups are resolved against the row executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyStrategy {
    /// Batched when the executor supports it, depth-first otherwise.
    #[default]
    Auto,
    /// One executor call per parent row and child group.
    DepthFirst,
    /// One executor call per child group and document level.
    Batched,
}

/// Configuration for the correlated assembler.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Execution strategy.
    pub strategy: AssemblyStrategy,
    /// Number of sibling child groups resolved concurrently (minimum 1).
    pub max_concurrency: usize,
    /// Maximum rows produced per assembly (0 = unlimited).
    pub row_limit: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            strategy: AssemblyStrategy::Auto,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            row_limit: 0,
        }
    }
}

impl AssemblyConfig {
    /// Creates a new assembly configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: AssemblyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the number of sibling groups resolved concurrently.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Resolves `Auto` against the executor's batch capability.
    #[must_use]
    pub fn effective_strategy(&self, executor_batches: bool) -> AssemblyStrategy {
        match self.strategy {
            AssemblyStrategy::Auto if executor_batches => AssemblyStrategy::Batched,
            AssemblyStrategy::Auto => AssemblyStrategy::DepthFirst,
            explicit => explicit,
        }
    }
}
