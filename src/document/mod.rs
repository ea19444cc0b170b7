//! Assembled hierarchical documents.
//!
//! A [`DocumentNode`] is one produced row plus its nested child
//! collections. The node returned by an assembly is a synthetic root with
//! an empty row and a single collection holding the requested group's
//! rows. Documents are format-agnostic; [`DocumentNode::walk`] drives a
//! [`DocumentVisitor`] depth-first and [`XmlWriter`] is one such visitor.

mod xml;

use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::catalog::{ElementDef, GroupDef};
use crate::error::Result;
use crate::types::{Row, Value};

pub use xml::XmlWriter;

/// The rows of one child group under a parent node.
#[derive(Debug, Clone)]
pub struct ChildCollection {
    group: Arc<GroupDef>,
    nodes: Vec<DocumentNode>,
}

impl ChildCollection {
    /// Creates a collection of nodes produced by `group`.
    #[must_use]
    pub fn new(group: Arc<GroupDef>, nodes: Vec<DocumentNode>) -> Self {
        ChildCollection { group, nodes }
    }

    /// Returns the group that produced the nodes.
    #[must_use]
    pub fn group(&self) -> &Arc<GroupDef> {
        &self.group
    }

    /// Returns the nodes in production order.
    #[must_use]
    pub fn nodes(&self) -> &[DocumentNode] {
        &self.nodes
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the collection has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn matches(&self, name: &str) -> bool {
        self.group.name() == name || self.group.short_name() == name
    }
}

impl PartialEq for ChildCollection {
    fn eq(&self, other: &Self) -> bool {
        self.group.name() == other.group.name() && self.nodes == other.nodes
    }
}

/// One assembled row plus its nested child collections.
#[derive(Debug, Clone)]
pub struct DocumentNode {
    group: Option<Arc<GroupDef>>,
    row: Arc<Row>,
    children: Vec<ChildCollection>,
}

impl DocumentNode {
    /// Creates a node for a row of `group`.
    #[must_use]
    pub fn new(group: Arc<GroupDef>, row: Arc<Row>, children: Vec<ChildCollection>) -> Self {
        DocumentNode {
            group: Some(group),
            row,
            children,
        }
    }

    /// Creates the synthetic root node holding a top-level collection.
    #[must_use]
    pub fn root(collection: ChildCollection) -> Self {
        DocumentNode {
            group: None,
            row: Arc::new(Row::empty()),
            children: vec![collection],
        }
    }

    /// Returns the group of this node, or None for a synthetic root.
    #[must_use]
    pub fn group(&self) -> Option<&Arc<GroupDef>> {
        self.group.as_ref()
    }

    /// Returns the qualified group name, or None for a synthetic root.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref().map(GroupDef::name)
    }

    /// Returns true for the synthetic root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.group.is_none()
    }

    /// Returns the row of this node.
    #[must_use]
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Gets a value by element name.
    #[must_use]
    pub fn value(&self, element: &str) -> Option<&Value> {
        let index = self.group.as_ref()?.element_index(element)?;
        self.row.get(index)
    }

    /// Returns the nodes of a child group, by qualified or short name.
    #[must_use]
    pub fn children(&self, group: &str) -> Option<&[DocumentNode]> {
        self.children
            .iter()
            .find(|c| c.group.name() == group)
            .or_else(|| self.children.iter().find(|c| c.matches(group)))
            .map(ChildCollection::nodes)
    }

    /// Returns the child collections in declaration order.
    #[must_use]
    pub fn collections(&self) -> &[ChildCollection] {
        &self.children
    }

    /// Returns the names of the child groups in declaration order.
    #[must_use]
    pub fn child_groups(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.group.name()).collect()
    }

    /// Returns the number of row nodes in this subtree, excluding a
    /// synthetic root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let own = usize::from(!self.is_root());
        own + self
            .children
            .iter()
            .flat_map(|c| &c.nodes)
            .map(DocumentNode::node_count)
            .sum::<usize>()
    }

    /// Returns the number of row levels below and including this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        let own = usize::from(!self.is_root());
        own + self
            .children
            .iter()
            .flat_map(|c| &c.nodes)
            .map(DocumentNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Walks the subtree depth-first.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the visitor.
    pub fn walk<V: DocumentVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        if let Some(group) = &self.group {
            visitor.enter_node(group, &self.row)?;
            for (element, value) in group.elements().iter().zip(self.row.iter()) {
                visitor.value(element, value)?;
            }
        }

        for collection in &self.children {
            visitor.enter_collection(&collection.group)?;
            for node in &collection.nodes {
                node.walk(visitor)?;
            }
            visitor.leave_collection(&collection.group)?;
        }

        if let Some(group) = &self.group {
            visitor.leave_node(group)?;
        }
        Ok(())
    }
}

impl PartialEq for DocumentNode {
    fn eq(&self, other: &Self) -> bool {
        self.group_name() == other.group_name()
            && self.row == other.row
            && self.children == other.children
    }
}

/// Callbacks for a depth-first document walk.
///
/// For every node the walk calls `enter_node`, then `value` for each
/// element in order, then the child collections, then `leave_node`.
pub trait DocumentVisitor {
    /// Called before the nodes of a child collection.
    fn enter_collection(&mut self, _group: &GroupDef) -> Result<()> {
        Ok(())
    }

    /// Called when a node is entered.
    fn enter_node(&mut self, group: &GroupDef, row: &Row) -> Result<()>;

    /// Called for each element value of the current node.
    fn value(&mut self, _element: &ElementDef, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Called after a node's children have been walked.
    fn leave_node(&mut self, _group: &GroupDef) -> Result<()> {
        Ok(())
    }

    /// Called after the nodes of a child collection.
    fn leave_collection(&mut self, _group: &GroupDef) -> Result<()> {
        Ok(())
    }
}

struct NamedValues<'a> {
    elements: &'a [ElementDef],
    row: &'a Row,
}

impl Serialize for NamedValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.elements.len()))?;
        for (element, value) in self.elements.iter().zip(self.row.iter()) {
            map.serialize_entry(&element.name, value)?;
        }
        map.end()
    }
}

impl Serialize for ChildCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChildCollection", 2)?;
        state.serialize_field("group", self.group.name())?;
        state.serialize_field("nodes", &self.nodes)?;
        state.end()
    }
}

impl Serialize for DocumentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let elements = self.group.as_deref().map_or(&[][..], GroupDef::elements);
        let mut state = serializer.serialize_struct("DocumentNode", 3)?;
        state.serialize_field("group", &self.group_name())?;
        state.serialize_field(
            "values",
            &NamedValues {
                elements,
                row: &self.row,
            },
        )?;
        state.serialize_field("children", &self.children)?;
        state.end()
    }
}
