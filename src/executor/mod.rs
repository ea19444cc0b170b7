//! Row executor boundary.
//!
//! The assembler never runs queries itself. It hands templated query text
//! and a fully bound parameter vector to a [`RowExecutor`] and receives the
//! produced rows in the executor's order. Executors that can answer many
//! parameter vectors in one round trip advertise it through
//! [`RowExecutor::supports_batch`], which lets the assembler resolve a
//! whole level of the document per child group instead of per row.

mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Row, Value};

pub use memory::{ExecutorCall, InMemoryExecutor};

/// Executes templated queries on behalf of the assembler.
///
/// Implementations must be safe to call concurrently; the assembler may
/// resolve sibling groups at the same time. Retries, if any, belong here.
#[async_trait]
pub trait RowExecutor: Send + Sync {
    /// Executes `query` with positional `params` and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if the query fails.
    async fn execute(&self, query: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Returns true if [`Self::execute_batch`] answers all parameter
    /// vectors in a single round trip.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Executes `query` once per parameter vector.
    ///
    /// The result at index `i` holds the rows for `param_sets[i]`. The
    /// default implementation runs the vectors one after another.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if any execution fails.
    async fn execute_batch(&self, query: &str, param_sets: &[Vec<Value>]) -> Result<Vec<Vec<Row>>> {
        let mut results = Vec::with_capacity(param_sets.len());
        for params in param_sets {
            results.push(self.execute(query, params).await?);
        }
        Ok(results)
    }
}
