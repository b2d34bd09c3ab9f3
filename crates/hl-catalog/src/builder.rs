//! Breadth-first catalog construction from a [`ContainerSource`].

use std::collections::HashSet;

use hl_core::CancelToken;
use tracing::debug;

use crate::catalog::{Catalog, NodeLinks};
use crate::error::{CatalogError, CatalogResult};
use crate::node::{CatalogNode, NodeKind};
use crate::path;
use crate::source::{ContainerSource, RawEntry};

/// Deepest group nesting accepted before the container is declared corrupt.
pub const MAX_DEPTH: usize = 64;

/// Most nodes indexed from one container. Backends without object
/// identity cannot report link cycles, so this bounds the walk instead.
pub const MAX_NODES: usize = 250_000;

#[derive(Debug, Clone, Copy)]
pub struct CatalogBuilder {
    max_depth: usize,
    max_nodes: usize,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: MAX_NODES,
        }
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Index every group and dataset reachable from the root.
    ///
    /// Only metadata is requested from the source. A link back to an
    /// ancestor, nesting deeper than the limit, more nodes than the node
    /// limit, duplicate sibling names or names containing `/` fail with
    /// `CorruptedStructure`.
    pub fn build(
        &self,
        source: &dyn ContainerSource,
        cancel: &CancelToken,
    ) -> CatalogResult<Catalog> {
        let root = source.root()?;
        let mut nodes = vec![to_node(path::ROOT.to_string(), &root)];
        let mut links = vec![NodeLinks {
            parent: None,
            first_child: 1,
            child_count: 0,
            depth: 0,
        }];
        let mut object_ids = vec![root.object_id];

        let mut cursor = 0;
        while cursor < nodes.len() {
            cancel.check()?;
            if nodes[cursor].kind != NodeKind::Group {
                links[cursor].first_child = nodes.len();
                cursor += 1;
                continue;
            }

            let group_path = nodes[cursor].path.clone();
            let depth = links[cursor].depth + 1;
            let entries = source.children(&group_path)?;

            if !entries.is_empty() && depth > self.max_depth {
                return Err(CatalogError::corrupted(
                    &group_path,
                    format!("group nesting exceeds {} levels", self.max_depth),
                ));
            }

            if nodes.len() + entries.len() > self.max_nodes {
                return Err(CatalogError::corrupted(
                    &group_path,
                    format!("container holds more than {} nodes", self.max_nodes),
                ));
            }

            let ancestors = ancestor_ids(cursor, &links, &object_ids);
            let mut seen = HashSet::with_capacity(entries.len());
            links[cursor].first_child = nodes.len();
            links[cursor].child_count = entries.len();

            for entry in entries {
                if entry.name.is_empty() || entry.name.contains('/') {
                    return Err(CatalogError::corrupted(
                        &group_path,
                        format!("invalid member name {:?}", entry.name),
                    ));
                }
                if !seen.insert(entry.name.clone()) {
                    return Err(CatalogError::corrupted(
                        &group_path,
                        format!("duplicate member {:?}", entry.name),
                    ));
                }
                if entry.kind == NodeKind::Group {
                    if let Some(id) = entry.object_id {
                        if ancestors.contains(&id) {
                            return Err(CatalogError::corrupted(
                                &path::join(&group_path, &entry.name),
                                "link cycle back to an ancestor group",
                            ));
                        }
                    }
                }

                nodes.push(to_node(path::join(&group_path, &entry.name), &entry));
                links.push(NodeLinks {
                    parent: Some(cursor),
                    first_child: 0,
                    child_count: 0,
                    depth,
                });
                object_ids.push(entry.object_id);
            }
            cursor += 1;
        }

        debug!(
            format = source.format_name(),
            nodes = nodes.len(),
            "catalog built"
        );
        Ok(Catalog::from_parts(nodes, links))
    }
}

fn ancestor_ids(
    mut idx: usize,
    links: &[NodeLinks],
    object_ids: &[Option<u64>],
) -> HashSet<u64> {
    let mut ids = HashSet::new();
    loop {
        if let Some(id) = object_ids[idx] {
            ids.insert(id);
        }
        match links[idx].parent {
            Some(p) => idx = p,
            None => break,
        }
    }
    ids
}

fn to_node(node_path: String, entry: &RawEntry) -> CatalogNode {
    CatalogNode {
        path: node_path,
        kind: entry.kind,
        shape: entry.shape.clone(),
        dtype: match entry.kind {
            NodeKind::Group => None,
            NodeKind::Dataset => entry.dtype,
        },
        attributes: entry.attributes.clone(),
    }
}
