//! Per-assembly state: cancellation, limits and statistics.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{NestqlError, Result};

/// Cancels in-flight assemblies that share it.
///
/// Once cancelled, an assembly issues no further executor calls and fails
/// with `Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counters describing the work done by one assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyStats {
    /// Executor round trips (`execute` and `execute_batch` calls).
    pub executor_calls: usize,
    /// Round trips made through `execute_batch`.
    pub batch_calls: usize,
    /// Parameter vectors sent across all round trips.
    pub parameter_vectors: usize,
    /// Rows produced by the executor.
    pub rows: usize,
}

#[derive(Debug, Default)]
pub(crate) struct AssemblyContext {
    cancel: CancelHandle,
    row_limit: usize,
    executor_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    parameter_vectors: AtomicUsize,
    rows: AtomicUsize,
}

impl AssemblyContext {
    pub(crate) fn new(cancel: CancelHandle, row_limit: usize) -> Self {
        AssemblyContext {
            cancel,
            row_limit,
            ..Self::default()
        }
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(NestqlError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn record_call(&self, vectors: usize, batched: bool) {
        self.executor_calls.fetch_add(1, Ordering::Relaxed);
        self.parameter_vectors.fetch_add(vectors, Ordering::Relaxed);
        if batched {
            self.batch_calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn add_rows(&self, count: usize) -> Result<()> {
        let total = self.rows.fetch_add(count, Ordering::Relaxed) + count;
        if self.row_limit > 0 && total > self.row_limit {
            return Err(NestqlError::RowLimitExceeded {
                limit: self.row_limit,
            });
        }
        Ok(())
    }

    pub(crate) fn stats(&self) -> AssemblyStats {
        AssemblyStats {
            executor_calls: self.executor_calls.load(Ordering::Relaxed),
            batch_calls: self.batch_calls.load(Ordering::Relaxed),
            parameter_vectors: self.parameter_vectors.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
        }
    }
}
