//! Scripted in-memory row executor.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{NestqlError, Result};
use crate::types::{Row, Value};

use super::RowExecutor;

/// A recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorCall {
    /// Query text as received.
    pub query: String,
    /// Parameter vectors; a single entry for non-batched calls.
    pub param_sets: Vec<Vec<Value>>,
    /// Whether the call came through `execute_batch`.
    pub batched: bool,
}

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Debug, Clone, Default)]
struct QueryResponses {
    by_params: HashMap<Vec<Value>, Response>,
    fallback: Option<Response>,
}

/// Row executor answering from scripted responses.
///
/// Responses are keyed by exact query text and parameter vector. A known
/// query with unscripted parameters yields its fallback rows, or no rows
/// if none were scripted; an unknown query is an `ExecutionError`. Every
/// call is recorded so callers can inspect the access pattern.
#[derive(Debug, Default)]
pub struct InMemoryExecutor {
    responses: HashMap<String, QueryResponses>,
    batch: bool,
    calls: Mutex<Vec<ExecutorCall>>,
}

impl InMemoryExecutor {
    /// Creates an executor with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the rows returned for `query` with exactly `params`.
    #[must_use]
    pub fn with_rows(mut self, query: &str, params: Vec<Value>, rows: Vec<Row>) -> Self {
        self.entry(query).by_params.insert(params, Response::Rows(rows));
        self
    }

    /// Scripts the rows returned for `query` with any unscripted parameters.
    #[must_use]
    pub fn with_default_rows(mut self, query: &str, rows: Vec<Row>) -> Self {
        self.entry(query).fallback = Some(Response::Rows(rows));
        self
    }

    /// Scripts a failure for `query` with exactly `params`.
    #[must_use]
    pub fn with_failure(mut self, query: &str, params: Vec<Value>, message: &str) -> Self {
        self.entry(query)
            .by_params
            .insert(params, Response::Fail(message.to_string()));
        self
    }

    /// Enables or disables single round-trip batch execution.
    #[must_use]
    pub fn with_batch_support(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    /// Returns all recorded calls in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the parameter vectors sent for `query`, in call order.
    #[must_use]
    pub fn params_for(&self, query: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.query == query)
            .flat_map(|c| c.param_sets.iter().cloned())
            .collect()
    }

    /// Clears the call log.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn entry(&mut self, query: &str) -> &mut QueryResponses {
        self.responses.entry(query.to_string()).or_default()
    }

    fn respond(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        let responses = self
            .responses
            .get(query)
            .ok_or_else(|| NestqlError::ExecutionError(format!("Unknown query: {query}")))?;

        match responses.by_params.get(params).or(responses.fallback.as_ref()) {
            Some(Response::Rows(rows)) => Ok(rows.clone()),
            Some(Response::Fail(message)) => Err(NestqlError::ExecutionError(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn record(&self, query: &str, param_sets: Vec<Vec<Value>>, batched: bool) {
        self.calls.lock().push(ExecutorCall {
            query: query.to_string(),
            param_sets,
            batched,
        });
    }
}

#[async_trait]
impl RowExecutor for InMemoryExecutor {
    async fn execute(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(query, vec![params.to_vec()], false);
        self.respond(query, params)
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn execute_batch(&self, query: &str, param_sets: &[Vec<Value>]) -> Result<Vec<Vec<Row>>> {
        self.record(query, param_sets.to_vec(), true);
        param_sets
            .iter()
            .map(|params| self.respond(query, params))
            .collect()
    }
}
