//! Group dependency graph (parent -> child nesting edges).

use std::collections::HashMap;

/// Nesting edges between groups, in declaration order.
///
/// Every group has at most one parent, so the graph is a forest exactly
/// when following parent links never revisits a group.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    parents: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group, with its nesting parent if it has one.
    ///
    /// Groups must be added in declaration order; child lists preserve it.
    pub fn add_group(&mut self, name: &str, parent: Option<&str>) {
        self.order.push(name.to_string());
        if let Some(parent) = parent {
            self.parents.insert(name.to_string(), parent.to_string());
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(name.to_string());
        }
    }

    /// Returns the nesting parent of a group.
    #[must_use]
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    /// Returns the children of a group in declaration order.
    #[must_use]
    pub fn children_of(&self, name: &str) -> &[String] {
        self.children.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns groups without a parent, in declaration order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| !self.parents.contains_key(*name))
            .map(String::as_str)
    }

    /// Returns the ancestors of a group, nearest parent first.
    ///
    /// Stops early if a cycle is encountered; call [`Self::find_cycle`]
    /// first to rule that out.
    #[must_use]
    pub fn ancestors_of(&self, name: &str) -> Vec<&str> {
        let mut ancestors: Vec<&str> = Vec::new();
        let mut current = self.parent_of(name);
        while let Some(parent) = current {
            if parent == name || ancestors.contains(&parent) {
                break;
            }
            ancestors.push(parent);
            current = self.parent_of(parent);
        }
        ancestors
    }

    /// Finds a cycle, returned as the group path that closes it.
    ///
    /// For `a -> b -> a` the result is `["a", "b", "a"]`, listed from the
    /// outermost group inward.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        for start in &self.order {
            // Walk child -> parent; a repeat means the chain loops.
            let mut chain: Vec<&str> = vec![start.as_str()];
            let mut current = self.parent_of(start);
            while let Some(parent) = current {
                if let Some(pos) = chain.iter().position(|g| *g == parent) {
                    let mut cycle: Vec<String> =
                        chain[pos..].iter().rev().map(|g| (*g).to_string()).collect();
                    cycle.insert(0, parent.to_string());
                    return Some(cycle);
                }
                chain.push(parent);
                current = self.parent_of(parent);
            }
        }
        None
    }
}
