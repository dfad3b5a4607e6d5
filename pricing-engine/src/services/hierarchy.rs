//! Hierarchical masters
//!
//! [`GroupTree`] indexes one hierarchy (item groups, territories, warehouses...)
//! as a nested set: every node carries `lft`/`rgt` bounds so ancestor and
//! descendant lookups are interval containment checks.
//! [`HierarchyClosureCache`] memoizes closures for one resolution request.

use super::catalog_service::{CatalogLookup, HierarchyKind};
use crate::db::repository::{RepoError, RepoResult};
use parking_lot::RwLock;
use shared::models::GroupNode;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct TreeNode {
    parent: Option<String>,
    is_group: bool,
    lft: u32,
    rgt: u32,
}

/// Nested-set index over one hierarchy
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    nodes: HashMap<String, TreeNode>,
    /// Children in insertion order
    children: HashMap<Option<String>, Vec<String>>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Insert a node and renumber the tree
    pub fn insert(&mut self, node: GroupNode) -> RepoResult<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(RepoError::Duplicate(format!("{} already exists", node.name)));
        }
        if let Some(parent) = &node.parent {
            match self.nodes.get(parent) {
                None => {
                    return Err(RepoError::NotFound(format!("Parent {} not found", parent)));
                }
                Some(p) if !p.is_group => {
                    return Err(RepoError::Validation(format!(
                        "Parent {} is not a group node",
                        parent
                    )));
                }
                Some(_) => {}
            }
        }

        self.children
            .entry(node.parent.clone())
            .or_default()
            .push(node.name.clone());
        self.nodes.insert(
            node.name,
            TreeNode {
                parent: node.parent,
                is_group: node.is_group,
                lft: 0,
                rgt: 0,
            },
        );
        self.renumber();
        Ok(())
    }

    fn renumber(&mut self) {
        let mut counter = 0;
        let roots = self.children.get(&None).cloned().unwrap_or_default();
        for root in roots {
            self.number(&root, &mut counter);
        }
    }

    fn number(&mut self, name: &str, counter: &mut u32) {
        *counter += 1;
        let lft = *counter;
        let kids = self
            .children
            .get(&Some(name.to_string()))
            .cloned()
            .unwrap_or_default();
        for kid in kids {
            self.number(&kid, counter);
        }
        *counter += 1;
        if let Some(node) = self.nodes.get_mut(name) {
            node.lft = lft;
            node.rgt = *counter;
        }
    }

    fn sorted_by_lft<'a>(&'a self, names: impl Iterator<Item = &'a String>) -> Vec<String> {
        let mut found: Vec<(&String, u32)> = names
            .filter_map(|n| self.nodes.get(n).map(|node| (n, node.lft)))
            .collect();
        found.sort_by_key(|(_, lft)| *lft);
        found.into_iter().map(|(n, _)| n.clone()).collect()
    }

    /// `name` and every node containing it, outermost first
    ///
    /// `None` when `name` is not in the tree.
    pub fn ancestors(&self, name: &str) -> Option<Vec<String>> {
        let node = self.nodes.get(name)?;
        let matching = self
            .nodes
            .iter()
            .filter(|(_, n)| n.lft <= node.lft && n.rgt >= node.rgt)
            .map(|(k, _)| k);
        Some(self.sorted_by_lft(matching))
    }

    /// `name` and every node inside it, in tree order
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let matching = self
            .nodes
            .iter()
            .filter(|(_, n)| n.lft >= node.lft && n.rgt <= node.rgt)
            .map(|(k, _)| k);
        self.sorted_by_lft(matching)
    }

    /// First root group (no parent)
    pub fn root(&self) -> Option<String> {
        self.children
            .get(&None)?
            .iter()
            .find(|r| self.nodes.get(*r).is_some_and(|n| n.is_group && n.parent.is_none()))
            .cloned()
    }
}

/// Per-request memo of hierarchy closures
///
/// Share one cache across the lines of a single document save; create a new
/// one (or [`reset`](Self::reset)) for the next independent request.
#[derive(Debug, Default)]
pub struct HierarchyClosureCache {
    ancestors: RwLock<HashMap<(HierarchyKind, String), Option<Arc<Vec<String>>>>>,
    descendants: RwLock<HashMap<(HierarchyKind, String), Arc<Vec<String>>>>,
}

impl HierarchyClosureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups a rule value may name to match `name`: its ancestors, itself,
    /// and the tree root for kinds that admit it
    ///
    /// `None` when `name` is unknown to the catalog.
    pub fn matching_groups(
        &self,
        catalog: &dyn CatalogLookup,
        kind: HierarchyKind,
        name: &str,
    ) -> Option<Arc<Vec<String>>> {
        let key = (kind, name.to_string());
        if let Some(hit) = self.ancestors.read().get(&key) {
            return hit.clone();
        }

        let computed = catalog.ancestors(kind, name).map(|mut groups| {
            if kind.includes_root()
                && let Some(root) = catalog.root(kind)
                && !groups.contains(&root)
            {
                groups.push(root);
            }
            Arc::new(groups)
        });

        self.ancestors.write().insert(key, computed.clone());
        computed
    }

    /// `name` and all nodes below it
    pub fn descendants(
        &self,
        catalog: &dyn CatalogLookup,
        kind: HierarchyKind,
        name: &str,
    ) -> Arc<Vec<String>> {
        let key = (kind, name.to_string());
        if let Some(hit) = self.descendants.read().get(&key) {
            return hit.clone();
        }

        let mut groups = catalog.descendants(kind, name);
        if groups.is_empty() {
            groups.push(name.to_string());
        }
        let groups = Arc::new(groups);
        self.descendants.write().insert(key, groups.clone());
        groups
    }

    /// Drop all memoized closures
    pub fn reset(&self) {
        self.ancestors.write().clear();
        self.descendants.write().clear();
    }

    pub fn len(&self) -> usize {
        self.ancestors.read().len() + self.descendants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
