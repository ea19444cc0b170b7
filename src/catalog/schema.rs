//! Schema definitions for leaf and virtual groups.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{NestqlError, Result};
use crate::template::{QueryTemplate, TemplateDef};
use crate::types::DataType;

/// Definition of a single element (column) in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDef {
    /// Element name.
    pub name: String,
    /// Element data type.
    pub data_type: DataType,
}

impl ElementDef {
    /// Creates a new element definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the element name is empty or contains a dot.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(NestqlError::SchemaError("Element name cannot be empty".into()));
        }
        if name.contains('.') {
            return Err(NestqlError::SchemaError(format!(
                "Element name '{name}' cannot contain '.'"
            )));
        }
        Ok(ElementDef { name, data_type })
    }
}

/// Declarative group definition, as supplied by a metadata loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    /// Qualified group name.
    pub name: String,
    /// Ordered element definitions; the order fixes the row shape.
    pub elements: Vec<ElementDef>,
    /// Query template, present iff the group is virtual.
    pub template: Option<TemplateDef>,
    /// Explicit nesting parent; inferred from the bindings when absent.
    #[serde(default)]
    pub parent: Option<String>,
}

impl GroupDefinition {
    /// Creates a leaf group backed directly by storage.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (empty name, no elements,
    /// duplicate element names).
    pub fn leaf(name: impl Into<String>, elements: Vec<ElementDef>) -> Result<Self> {
        let def = GroupDefinition {
            name: name.into(),
            elements,
            template: None,
            parent: None,
        };
        def.validate()?;
        Ok(def)
    }

    /// Creates a virtual group whose rows come from `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (empty name, no elements,
    /// duplicate element names).
    pub fn virtual_group(
        name: impl Into<String>,
        elements: Vec<ElementDef>,
        template: TemplateDef,
    ) -> Result<Self> {
        let def = GroupDefinition {
            name: name.into(),
            elements,
            template: Some(template),
            parent: None,
        };
        def.validate()?;
        Ok(def)
    }

    /// Declares the nesting parent explicitly.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Returns true if the group is virtual.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.template.is_some()
    }

    /// Finds the index of an element by name.
    #[must_use]
    pub fn element_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(NestqlError::SchemaError("Group name cannot be empty".into()));
        }

        if self.elements.is_empty() {
            return Err(NestqlError::SchemaError(format!(
                "Group '{}' must have at least one element",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for element in &self.elements {
            if !seen.insert(&element.name) {
                return Err(NestqlError::SchemaError(format!(
                    "Duplicate element name '{}' in group '{}'",
                    element.name, self.name
                )));
            }
        }

        if !self.is_virtual() && self.parent.is_some() {
            return Err(NestqlError::SchemaError(format!(
                "Leaf group '{}' cannot declare a parent",
                self.name
            )));
        }

        Ok(())
    }
}

/// How a group's rows are produced.
#[derive(Debug, Clone)]
pub enum GroupKind {
    /// Rows live in base storage; the group cannot be assembled.
    Leaf,
    /// Rows are produced by executing the compiled template.
    Virtual(Arc<QueryTemplate>),
}

/// A group resolved against the rest of its catalog.
#[derive(Debug, Clone)]
pub struct GroupDef {
    definition: GroupDefinition,
    kind: GroupKind,
    parent: Option<String>,
}

impl GroupDef {
    pub(crate) fn new(definition: GroupDefinition, kind: GroupKind, parent: Option<String>) -> Self {
        GroupDef {
            definition,
            kind,
            parent,
        }
    }

    /// Returns the qualified group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the last dot-separated segment of the group name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.definition
            .name
            .rsplit('.')
            .next()
            .unwrap_or(&self.definition.name)
    }

    /// Returns the ordered element definitions.
    #[must_use]
    pub fn elements(&self) -> &[ElementDef] {
        &self.definition.elements
    }

    /// Returns the number of elements, i.e. the expected row arity.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.definition.elements.len()
    }

    /// Finds an element definition by name.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.definition.elements.iter().find(|e| e.name == name)
    }

    /// Finds the index of an element by name.
    #[must_use]
    pub fn element_index(&self, name: &str) -> Option<usize> {
        self.definition.element_index(name)
    }

    /// Returns how the group's rows are produced.
    #[must_use]
    pub fn kind(&self) -> &GroupKind {
        &self.kind
    }

    /// Returns the compiled template of a virtual group.
    #[must_use]
    pub fn template(&self) -> Option<&Arc<QueryTemplate>> {
        match &self.kind {
            GroupKind::Virtual(template) => Some(template),
            GroupKind::Leaf => None,
        }
    }

    /// Returns true if the group is virtual.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, GroupKind::Virtual(_))
    }

    /// Returns the resolved nesting parent, declared or inferred.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the definition the group was built from.
    #[must_use]
    pub fn definition(&self) -> &GroupDefinition {
        &self.definition
    }
}
