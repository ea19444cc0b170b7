//! Ordered row tuples produced by a row executor.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::Value;

/// An ordered tuple of values, one per element of the producing group.
///
/// Rows are never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from its values in element order.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    /// Creates a row with no values.
    #[must_use]
    pub fn empty() -> Self {
        Row { values: Vec::new() }
    }

    /// Gets the value at the given element position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of values in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over the values in element order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Returns the values as a slice.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// Builds a [`Row`] from a list of expressions convertible into [`Value`].
///
/// ```
/// use nestql::row;
/// use nestql::types::Value;
///
/// let r = row![1, "A", 5, "OK"];
/// assert_eq!(r.len(), 4);
/// assert_eq!(r[1], Value::from("A"));
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::types::Row::new(vec![$($crate::types::Value::from($value)),*])
    };
}
