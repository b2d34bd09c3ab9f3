//! Immutable arena of node metadata.
//!
//! Nodes are stored breadth-first, so the children of any group occupy one
//! contiguous range of the arena and can be handed out as a slice.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{CatalogError, CatalogResult};
use crate::node::{CatalogNode, NodeKind};
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeLinks {
    pub parent: Option<usize>,
    pub first_child: usize,
    pub child_count: usize,
    pub depth: usize,
}

impl NodeLinks {
    fn children(&self) -> Range<usize> {
        self.first_child..self.first_child + self.child_count
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    nodes: Vec<CatalogNode>,
    links: Vec<NodeLinks>,
    by_path: HashMap<String, usize>,
}

impl Catalog {
    pub(crate) fn from_parts(nodes: Vec<CatalogNode>, links: Vec<NodeLinks>) -> Self {
        let by_path = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();
        Self {
            nodes,
            links,
            by_path,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&CatalogNode> {
        self.nodes.first()
    }

    /// Look up a node. The path is normalized first.
    pub fn get(&self, node_path: &str) -> Option<&CatalogNode> {
        self.index_of(node_path).map(|i| &self.nodes[i])
    }

    pub fn contains(&self, node_path: &str) -> bool {
        self.index_of(node_path).is_some()
    }

    fn index_of(&self, node_path: &str) -> Option<usize> {
        self.by_path.get(&path::normalize(node_path)).copied()
    }

    /// Direct children of a group, in backend order.
    pub fn children(&self, group_path: &str) -> CatalogResult<&[CatalogNode]> {
        let canonical = path::normalize(group_path);
        let idx = self
            .by_path
            .get(&canonical)
            .copied()
            .ok_or_else(|| CatalogError::missing(&canonical))?;
        if self.nodes[idx].kind != NodeKind::Group {
            return Err(CatalogError::WrongKind {
                path: canonical,
                expected: "group",
            });
        }
        Ok(&self.nodes[self.links[idx].children()])
    }

    pub fn parent(&self, node_path: &str) -> Option<&CatalogNode> {
        let idx = self.index_of(node_path)?;
        self.links[idx].parent.map(|p| &self.nodes[p])
    }

    /// Depth below the root (root is 0).
    pub fn depth(&self, node_path: &str) -> Option<usize> {
        self.index_of(node_path).map(|i| self.links[i].depth)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogNode> {
        self.nodes.iter()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &CatalogNode> {
        self.nodes.iter().filter(|n| n.is_dataset())
    }

    pub fn groups(&self) -> impl Iterator<Item = &CatalogNode> {
        self.nodes.iter().filter(|n| n.is_group())
    }

    /// All nodes strictly below `group_path`, breadth-first.
    pub fn descendants(&self, group_path: &str) -> CatalogResult<Vec<&CatalogNode>> {
        let canonical = path::normalize(group_path);
        let start = self
            .by_path
            .get(&canonical)
            .copied()
            .ok_or_else(|| CatalogError::missing(&canonical))?;

        let mut out = Vec::new();
        let mut frontier = vec![start];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for idx in frontier {
                for child in self.links[idx].children() {
                    out.push(&self.nodes[child]);
                    next.push(child);
                }
            }
            frontier = next;
        }
        Ok(out)
    }

    /// Datasets whose lower-cased path contains any of `keywords`.
    pub fn search_datasets(&self, keywords: &[&str]) -> Vec<&CatalogNode> {
        self.datasets()
            .filter(|n| {
                let lower = n.path.to_lowercase();
                keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
            })
            .collect()
    }
}
