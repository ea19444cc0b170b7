//! Contract tests for the binder and row executor boundaries.

mod binder_contract;
mod executor_contract;
