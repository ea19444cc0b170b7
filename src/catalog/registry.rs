//! Central registry of group definitions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{NestqlError, Result};
use crate::template::{split_qualified, QueryTemplate};

use super::graph::DependencyGraph;
use super::schema::{ElementDef, GroupDef, GroupDefinition, GroupKind};

/// An element addressed by qualified name.
#[derive(Debug, Clone)]
pub struct ElementRef {
    /// Group owning the element.
    pub group: Arc<GroupDef>,
    /// Position of the element within the group's rows.
    pub position: usize,
}

impl ElementRef {
    /// Returns the element definition.
    #[must_use]
    pub fn element(&self) -> &ElementDef {
        &self.group.elements()[self.position]
    }
}

/// Collects group definitions and validates them into a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    definitions: Vec<GroupDefinition>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group definition.
    ///
    /// Registration order is the order in which sibling child groups are
    /// nested in assembled documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or a group with the
    /// same name already exists.
    pub fn add_group(&mut self, definition: GroupDefinition) -> Result<&mut Self> {
        definition.validate()?;
        if self.definitions.iter().any(|d| d.name == definition.name) {
            return Err(NestqlError::SchemaError(format!(
                "Group '{}' already exists",
                definition.name
            )));
        }
        self.definitions.push(definition);
        Ok(self)
    }

    /// Validates all definitions and compiles their templates.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a binding names an unknown group or element, or a
    ///   declared parent does not exist
    /// - `SchemaError` if nesting is ambiguous, a parent is not virtual, a
    ///   binding references a non-ancestor, or a template's placeholders
    ///   or types disagree with its bindings
    /// - `CyclicDependency` if the nesting graph contains a cycle
    pub fn build(self) -> Result<Catalog> {
        let by_name: HashMap<&str, &GroupDefinition> = self
            .definitions
            .iter()
            .map(|d| (d.name.as_str(), d))
            .collect();

        // Every binding must name an existing element.
        for def in &self.definitions {
            for binding in def.template.iter().flat_map(|t| &t.bindings) {
                let (group, element) = split_qualified(&binding.element)
                    .ok_or_else(|| NestqlError::element_not_found(binding.element.clone()))?;
                let target = by_name
                    .get(group)
                    .ok_or_else(|| NestqlError::element_not_found(binding.element.clone()))?;
                if target.element_index(element).is_none() {
                    return Err(NestqlError::element_not_found(binding.element.clone()));
                }
            }
        }

        let mut graph = DependencyGraph::new();
        let mut parents = Vec::with_capacity(self.definitions.len());
        let mut resolver = ParentResolver::new(&by_name);
        for def in &self.definitions {
            let parent = resolver.parent_of(def.name.as_str())?;
            graph.add_group(&def.name, parent);
            parents.push(parent.map(str::to_string));
        }

        if let Some(path) = graph.find_cycle() {
            return Err(NestqlError::CyclicDependency { path });
        }

        let mut groups = HashMap::with_capacity(self.definitions.len());
        for (def, parent) in self.definitions.iter().zip(parents) {
            let kind = match &def.template {
                Some(template) => {
                    let ancestors: Vec<&GroupDefinition> = graph
                        .ancestors_of(&def.name)
                        .into_iter()
                        .filter_map(|name| by_name.get(name).copied())
                        .collect();
                    let compiled = QueryTemplate::compile(&def.name, template, &ancestors)?;
                    GroupKind::Virtual(Arc::new(compiled))
                }
                None => GroupKind::Leaf,
            };
            groups.insert(
                def.name.clone(),
                Arc::new(GroupDef::new(def.clone(), kind, parent)),
            );
        }

        debug!(
            groups = groups.len(),
            roots = graph.roots().count(),
            "built catalog"
        );

        Ok(Catalog {
            groups,
            order: self.definitions.iter().map(|d| d.name.clone()).collect(),
            graph,
        })
    }
}

/// Determines nesting parents: declared, or inferred from the groups a
/// template binds to.
///
/// With several referenced groups the parent is the one nested deepest,
/// which requires the parents of the referenced groups first. Results are
/// memoized per group.
struct ParentResolver<'a> {
    by_name: &'a HashMap<&'a str, &'a GroupDefinition>,
    resolved: HashMap<&'a str, Option<&'a str>>,
    in_progress: Vec<&'a str>,
}

impl<'a> ParentResolver<'a> {
    fn new(by_name: &'a HashMap<&'a str, &'a GroupDefinition>) -> Self {
        Self {
            by_name,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn parent_of(&mut self, name: &'a str) -> Result<Option<&'a str>> {
        if let Some(parent) = self.resolved.get(name) {
            return Ok(*parent);
        }
        if let Some(pos) = self.in_progress.iter().position(|g| *g == name) {
            let mut path: Vec<String> = self.in_progress[pos..]
                .iter()
                .rev()
                .map(|g| (*g).to_string())
                .collect();
            path.insert(0, name.to_string());
            return Err(NestqlError::CyclicDependency { path });
        }
        let Some(def) = self.by_name.get(name).copied() else {
            return Ok(None);
        };

        self.in_progress.push(name);
        let parent = self.infer(def);
        self.in_progress.pop();

        let parent = parent?;
        self.resolved.insert(name, parent);
        Ok(parent)
    }

    fn infer(&mut self, def: &'a GroupDefinition) -> Result<Option<&'a str>> {
        if let Some(parent) = &def.parent {
            let target = self
                .by_name
                .get(parent.as_str())
                .ok_or_else(|| NestqlError::group_not_found(parent.clone()))?;
            if !target.is_virtual() {
                return Err(NestqlError::SchemaError(format!(
                    "Group '{}' cannot nest under leaf group '{parent}'",
                    def.name
                )));
            }
            return Ok(Some(parent.as_str()));
        }

        let mut referenced: Vec<&'a str> = Vec::new();
        let mut seen = HashSet::new();
        for binding in def.template.iter().flat_map(|t| &t.bindings) {
            if let Some(group) = binding.group_name() {
                if seen.insert(group) {
                    referenced.push(group);
                }
            }
        }

        let leaf = referenced
            .iter()
            .find(|g| self.by_name.get(*g).is_some_and(|d| !d.is_virtual()));
        if let Some(leaf) = leaf {
            return Err(NestqlError::SchemaError(format!(
                "Group '{}' binds to leaf group '{leaf}'; only virtual groups produce rows",
                def.name
            )));
        }
        if referenced.len() <= 1 {
            return Ok(referenced.first().copied());
        }

        let mut chains = Vec::with_capacity(referenced.len());
        for &group in &referenced {
            chains.push(self.chain_from(group)?);
        }
        referenced
            .iter()
            .zip(&chains)
            .find(|(_, chain)| referenced.iter().all(|g| chain.contains(g)))
            .map(|(group, _)| Some(*group))
            .ok_or_else(|| {
                NestqlError::SchemaError(format!(
                    "Group '{}' binds to groups on separate branches ({}); declare its parent explicitly",
                    def.name,
                    referenced.join(", ")
                ))
            })
    }

    /// Returns `group` followed by its ancestors, nearest first.
    fn chain_from(&mut self, group: &'a str) -> Result<Vec<&'a str>> {
        let mut chain = vec![group];
        let mut current = self.parent_of(group)?;
        while let Some(parent) = current {
            if self.in_progress.contains(&parent) {
                // `parent` would end up nested below its own descendants.
                let mut path = vec![parent.to_string()];
                path.extend(chain.iter().rev().map(|g| (*g).to_string()));
                path.push(parent.to_string());
                return Err(NestqlError::CyclicDependency { path });
            }
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.parent_of(parent)?;
        }
        Ok(chain)
    }
}

/// Read-only registry of groups, built once and shared across assemblies.
#[derive(Debug, Clone)]
pub struct Catalog {
    groups: HashMap<String, Arc<GroupDef>>,
    order: Vec<String>,
    graph: DependencyGraph,
}

impl Catalog {
    /// Returns a new catalog builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Builds a catalog from a list of definitions.
    ///
    /// # Errors
    ///
    /// See [`CatalogBuilder::build`].
    pub fn from_definitions(definitions: Vec<GroupDefinition>) -> Result<Self> {
        let mut builder = CatalogBuilder::new();
        for definition in definitions {
            builder.add_group(definition)?;
        }
        builder.build()
    }

    /// Looks up a group by qualified name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such group is registered.
    pub fn lookup_group(&self, name: &str) -> Result<Arc<GroupDef>> {
        self.groups
            .get(name)
            .cloned()
            .ok_or_else(|| NestqlError::group_not_found(name))
    }

    /// Looks up an element by qualified name (`<group>.<element>`).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group or element does not exist.
    pub fn lookup_element(&self, qualified_name: &str) -> Result<ElementRef> {
        let (group_name, element_name) = split_qualified(qualified_name)
            .ok_or_else(|| NestqlError::element_not_found(qualified_name))?;
        let group = self
            .groups
            .get(group_name)
            .ok_or_else(|| NestqlError::element_not_found(qualified_name))?;
        let position = group
            .element_index(element_name)
            .ok_or_else(|| NestqlError::element_not_found(qualified_name))?;
        Ok(ElementRef {
            group: Arc::clone(group),
            position,
        })
    }

    /// Returns the groups nested under `group`, in registration order.
    #[must_use]
    pub fn child_groups_of(&self, group: &str) -> Vec<Arc<GroupDef>> {
        self.graph
            .children_of(group)
            .iter()
            .filter_map(|name| self.groups.get(name).cloned())
            .collect()
    }

    /// Returns the ancestors of `group`, nearest parent first.
    #[must_use]
    pub fn ancestors_of(&self, group: &str) -> Vec<Arc<GroupDef>> {
        self.graph
            .ancestors_of(group)
            .into_iter()
            .filter_map(|name| self.groups.get(name).cloned())
            .collect()
    }

    /// Returns the virtual groups without a parent, in registration order.
    #[must_use]
    pub fn root_groups(&self) -> Vec<Arc<GroupDef>> {
        self.graph
            .roots()
            .filter_map(|name| self.groups.get(name))
            .filter(|g| g.is_virtual())
            .cloned()
            .collect()
    }

    /// Returns all group names in registration order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Checks if a group exists in the catalog.
    #[must_use]
    pub fn group_exists(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no groups are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Serializes the catalog definitions to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let definitions: Vec<&GroupDefinition> = self
            .order
            .iter()
            .filter_map(|name| self.groups.get(name))
            .map(|g| g.definition())
            .collect();
        bincode::serialize(&definitions)
            .map_err(|e| NestqlError::CatalogError(format!("Failed to serialize catalog: {e}")))
    }

    /// Deserializes and re-validates a catalog from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the decoded
    /// definitions do not form a valid catalog.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let definitions: Vec<GroupDefinition> = bincode::deserialize(data).map_err(|e| {
            NestqlError::CatalogError(format!("Failed to deserialize catalog: {e}"))
        })?;
        Self::from_definitions(definitions)
    }
}
