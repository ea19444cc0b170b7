//! Query templates and correlated bindings.
//!
//! A template pairs opaque query text with the ordered bindings that feed
//! its positional placeholders. Templates are compiled once when a catalog
//! is built: every binding is turned into a [`ParameterSlot`] holding the
//! ancestor distance and element position it reads from, so resolving a
//! parameter for a row is an index lookup rather than a name search.

mod placeholder;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::GroupDefinition;
use crate::error::{NestqlError, Result};
use crate::types::DataType;

pub use placeholder::{scan_placeholders, Placeholder};

/// Splits a qualified element name at its last dot.
///
/// `xmltest.group.items.itemNum` yields `("xmltest.group.items", "itemNum")`.
#[must_use]
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (group, element) = name.rsplit_once('.')?;
    if group.is_empty() || element.is_empty() {
        return None;
    }
    Some((group, element))
}

/// A reference from a template parameter to an ancestor group's element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Qualified element name (`<group>.<element>`).
    pub element: String,
    /// Type the inner query expects for this parameter, if known.
    pub expected: Option<DataType>,
}

impl Binding {
    /// Creates an untyped binding; bound values are passed through as-is.
    #[must_use]
    pub fn new(element: impl Into<String>) -> Self {
        Binding {
            element: element.into(),
            expected: None,
        }
    }

    /// Creates a binding whose values are coerced to `expected`.
    #[must_use]
    pub fn typed(element: impl Into<String>, expected: DataType) -> Self {
        Binding {
            element: element.into(),
            expected: Some(expected),
        }
    }

    /// Returns the qualified name of the referenced group.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        split_qualified(&self.element).map(|(g, _)| g)
    }

    /// Returns the unqualified name of the referenced element.
    #[must_use]
    pub fn element_name(&self) -> Option<&str> {
        split_qualified(&self.element).map(|(_, e)| e)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            Some(t) => write!(f, "{} AS {t}", self.element),
            None => f.write_str(&self.element),
        }
    }
}

/// Declared, uncompiled template as it appears in catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDef {
    /// Parameterized query text, passed through to the row executor.
    pub query: String,
    /// Bindings in placeholder order.
    pub bindings: Vec<Binding>,
}

impl TemplateDef {
    /// Creates a template definition.
    #[must_use]
    pub fn new(query: impl Into<String>, bindings: Vec<Binding>) -> Self {
        TemplateDef {
            query: query.into(),
            bindings,
        }
    }

    /// Creates an uncorrelated template.
    #[must_use]
    pub fn uncorrelated(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }
}

/// A compiled binding: where in the ancestor scope its value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSlot {
    /// The binding this slot was compiled from.
    pub binding: Binding,
    /// Qualified name of the ancestor group read by this slot.
    pub group: String,
    /// Distance above the nesting parent (0 = the parent itself).
    pub levels_up: usize,
    /// Position of the bound element within the ancestor's rows.
    pub position: usize,
    /// Declared type of the bound element.
    pub source_type: DataType,
}

impl ParameterSlot {
    /// Returns the type the inner query expects, if declared.
    #[must_use]
    pub fn expected(&self) -> Option<DataType> {
        self.binding.expected
    }
}

/// Immutable compiled query template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    query: Arc<str>,
    slots: Vec<ParameterSlot>,
    definition: TemplateDef,
}

impl QueryTemplate {
    /// Compiles a template for `group`.
    ///
    /// `ancestors` is the nesting chain of the group, nearest parent first.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the placeholder count differs from the
    /// binding count, a binding names a group outside the ancestor chain, or
    /// a bound element type can never coerce to the expected type. Returns
    /// `NotFound` if a bound element does not exist.
    pub(crate) fn compile(
        group: &str,
        definition: &TemplateDef,
        ancestors: &[&GroupDefinition],
    ) -> Result<Self> {
        let placeholders = scan_placeholders(&definition.query).map_err(|e| match e {
            NestqlError::SchemaError(msg) => {
                NestqlError::SchemaError(format!("Group '{group}': {msg}"))
            }
            other => other,
        })?;

        if placeholders.len() != definition.bindings.len() {
            return Err(NestqlError::SchemaError(format!(
                "Group '{group}': query has {} placeholder(s) but {} binding(s) are declared",
                placeholders.len(),
                definition.bindings.len()
            )));
        }

        let slots = definition
            .bindings
            .iter()
            .map(|binding| compile_slot(group, binding, ancestors))
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryTemplate {
            query: Arc::from(definition.query.as_str()),
            slots,
            definition: definition.clone(),
        })
    }

    /// Returns the raw query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the compiled parameter slots in placeholder order.
    #[must_use]
    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }

    /// Returns the number of parameters the query expects.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if any parameter is bound to an ancestor row.
    #[must_use]
    pub fn is_correlated(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Returns the definition this template was compiled from.
    #[must_use]
    pub fn definition(&self) -> &TemplateDef {
        &self.definition
    }
}

fn compile_slot(
    group: &str,
    binding: &Binding,
    ancestors: &[&GroupDefinition],
) -> Result<ParameterSlot> {
    let (group_name, element_name) = split_qualified(&binding.element)
        .ok_or_else(|| NestqlError::element_not_found(binding.element.clone()))?;

    let levels_up = ancestors
        .iter()
        .position(|a| a.name == group_name)
        .ok_or_else(|| {
            NestqlError::SchemaError(format!(
                "Group '{group}': binding '{}' references '{group_name}', which is not an ancestor",
                binding.element
            ))
        })?;

    let ancestor = ancestors[levels_up];
    let position = ancestor
        .element_index(element_name)
        .ok_or_else(|| NestqlError::element_not_found(binding.element.clone()))?;
    let source_type = ancestor.elements[position].data_type;

    if let Some(expected) = binding.expected {
        if !source_type.can_coerce_to(expected) {
            return Err(NestqlError::SchemaError(format!(
                "Group '{group}': binding '{}' of type {source_type} can never be coerced to {expected}",
                binding.element
            )));
        }
    }

    Ok(ParameterSlot {
        binding: binding.clone(),
        group: group_name.to_string(),
        levels_up,
        position,
        source_type,
    })
}
