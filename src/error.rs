//! Error types for nestql catalog and assembly operations.

use thiserror::Error;

/// Result type alias using [`NestqlError`].
pub type Result<T> = std::result::Result<T, NestqlError>;

/// Error types for nestql operations.
#[derive(Debug, Error)]
pub enum NestqlError {
    // ==================== Definition-time Errors ====================
    /// Unknown group or element name.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Binding/template arity or type mismatch, duplicate names, bad nesting.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The group dependency graph contains a cycle.
    #[error("Cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// Catalog snapshot encode/decode errors.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    // ==================== Resolution Errors ====================
    /// Outer row does not match the shape of its group.
    #[error("Binding resolution error: {0}")]
    BindingResolutionError(String),

    /// A bound value cannot be coerced to the expected parameter type.
    #[error("Type mismatch: expected {expected}, got {actual} ({detail})")]
    TypeMismatch {
        expected: String,
        actual: String,
        detail: String,
    },

    /// Opaque failure reported by the row executor.
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// The assembly was cancelled before it completed.
    #[error("Assembly cancelled")]
    Cancelled,

    /// Total produced rows exceeded the configured limit.
    #[error("Row limit exceeded: more than {limit} rows produced")]
    RowLimitExceeded { limit: usize },

    /// Failure while assembling a specific group.
    #[error("Failed to assemble group '{group}' at path '{}': {source}", path.join("/"))]
    Assembly {
        group: String,
        path: Vec<String>,
        #[source]
        source: Box<NestqlError>,
    },

    // ==================== Output Errors ====================
    /// Document writer errors.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NestqlError {
    /// Creates a `NotFound` error for a group name.
    #[must_use]
    pub fn group_not_found(name: impl Into<String>) -> Self {
        NestqlError::NotFound {
            kind: "Group",
            name: name.into(),
        }
    }

    /// Creates a `NotFound` error for a qualified element name.
    #[must_use]
    pub fn element_not_found(name: impl Into<String>) -> Self {
        NestqlError::NotFound {
            kind: "Element",
            name: name.into(),
        }
    }

    /// Attaches the group and resolution path at which the error occurred.
    ///
    /// Errors that already carry a location are returned unchanged so the
    /// innermost location is reported. Cancellation is never wrapped.
    #[must_use]
    pub fn at(self, group: &str, path: &[String]) -> Self {
        match self {
            err @ (NestqlError::Assembly { .. } | NestqlError::Cancelled) => err,
            err => NestqlError::Assembly {
                group: group.to_string(),
                path: path.to_vec(),
                source: Box::new(err),
            },
        }
    }

    /// Returns the underlying error with any location wrappers removed.
    #[must_use]
    pub fn root_cause(&self) -> &NestqlError {
        match self {
            NestqlError::Assembly { source, .. } => source.root_cause(),
            err => err,
        }
    }
}
