//! In-memory container backend.
//!
//! Used to build synthetic containers for tests and for callers that already
//! hold decoded arrays. Supports hard-link style aliases so malformed
//! (cyclic) layouts can be reproduced.

use std::collections::BTreeMap;

use crate::array::ArrayChunk;
use crate::error::{CatalogError, CatalogResult};
use crate::node::{AttrValue, DType, NodeKind};
use crate::path;
use crate::selection::Selection;
use crate::source::{ContainerSource, RawEntry};

#[derive(Debug, Clone)]
enum Payload {
    None,
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

#[derive(Debug, Clone)]
struct MemEntry {
    kind: NodeKind,
    shape: Vec<usize>,
    dtype: Option<DType>,
    attributes: BTreeMap<String, AttrValue>,
    payload: Payload,
    object_id: u64,
    alias_of: Option<String>,
}

impl MemEntry {
    fn group(object_id: u64) -> Self {
        Self {
            kind: NodeKind::Group,
            shape: Vec::new(),
            dtype: None,
            attributes: BTreeMap::new(),
            payload: Payload::None,
            object_id,
            alias_of: None,
        }
    }
}

/// Builder-style in-memory hierarchical container.
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    entries: BTreeMap<String, MemEntry>,
    next_id: u64,
}

impl Default for MemoryContainer {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(path::ROOT.to_string(), MemEntry::group(0));
        Self {
            entries,
            next_id: 1,
        }
    }
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group (and any missing ancestors).
    pub fn group(mut self, group_path: &str) -> Self {
        let canonical = path::normalize(group_path);
        self.ensure_group(&canonical);
        self
    }

    /// Add a `float64` dataset.
    pub fn dataset(self, dataset_path: &str, shape: &[usize], data: Vec<f64>) -> Self {
        self.dataset_with_dtype(dataset_path, shape, DType::Float64, data)
    }

    /// Add a numeric dataset reported with `dtype`. A data length that does
    /// not match `shape` is kept as-is and surfaces as a read error.
    pub fn dataset_with_dtype(
        mut self,
        dataset_path: &str,
        shape: &[usize],
        dtype: DType,
        data: Vec<f64>,
    ) -> Self {
        self.insert_dataset(dataset_path, shape.to_vec(), dtype, Payload::Numeric(data));
        self
    }

    /// Add a rank-1 string dataset.
    pub fn strings<S: Into<String>>(
        mut self,
        dataset_path: &str,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let shape = vec![values.len()];
        self.insert_dataset(dataset_path, shape, DType::String, Payload::Text(values));
        self
    }

    /// Set an attribute on an existing node (use `/` for the root).
    pub fn attr(mut self, node_path: &str, name: &str, value: impl Into<AttrValue>) -> Self {
        let canonical = path::normalize(node_path);
        if !self.entries.contains_key(&canonical) {
            self.ensure_group(&canonical);
        }
        if let Some(entry) = self.entries.get_mut(&canonical) {
            entry.attributes.insert(name.to_string(), value.into());
        }
        self
    }

    /// Add `link_path` as a hard link to the existing group `target`.
    pub fn link(mut self, link_path: &str, target: &str) -> Self {
        let link = path::normalize(link_path);
        let target = path::normalize(target);
        if let Some(parent) = path::parent(&link) {
            let parent = parent.to_string();
            self.ensure_group(&parent);
        }
        let object_id = self
            .entries
            .get(&target)
            .map(|e| e.object_id)
            .unwrap_or(u64::MAX);
        let mut entry = MemEntry::group(object_id);
        entry.alias_of = Some(target);
        self.entries.insert(link, entry);
        self
    }

    fn ensure_group(&mut self, canonical: &str) {
        let mut current = String::new();
        for segment in canonical.split('/').filter(|s| !s.is_empty()) {
            current = path::join(if current.is_empty() { path::ROOT } else { &current }, segment);
            if !self.entries.contains_key(&current) {
                let id = self.bump_id();
                self.entries.insert(current.clone(), MemEntry::group(id));
            }
        }
    }

    fn insert_dataset(&mut self, dataset_path: &str, shape: Vec<usize>, dtype: DType, payload: Payload) {
        let canonical = path::normalize(dataset_path);
        if let Some(parent) = path::parent(&canonical) {
            let parent = parent.to_string();
            self.ensure_group(&parent);
        }
        let object_id = self.bump_id();
        self.entries.insert(
            canonical,
            MemEntry {
                kind: NodeKind::Dataset,
                shape,
                dtype: Some(dtype),
                attributes: BTreeMap::new(),
                payload,
                object_id,
                alias_of: None,
            },
        );
    }

    fn bump_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Follow aliases component by component.
    fn resolve(&self, node_path: &str) -> Option<String> {
        let mut current = path::ROOT.to_string();
        for segment in node_path.split('/').filter(|s| !s.is_empty()) {
            current = path::join(&current, segment);
            // Bounded: an alias chain longer than the map is itself a cycle.
            let mut hops = 0;
            while let Some(target) = self.entries.get(&current).and_then(|e| e.alias_of.clone()) {
                current = target;
                hops += 1;
                if hops > self.entries.len() {
                    return None;
                }
            }
            if !self.entries.contains_key(&current) {
                return None;
            }
        }
        Some(current)
    }

    fn entry(&self, node_path: &str) -> CatalogResult<(String, &MemEntry)> {
        let resolved = self
            .resolve(node_path)
            .ok_or_else(|| CatalogError::missing(node_path))?;
        let entry = self
            .entries
            .get(&resolved)
            .ok_or_else(|| CatalogError::missing(node_path))?;
        Ok((resolved, entry))
    }

    fn raw_entry(&self, name: &str, entry: &MemEntry) -> RawEntry {
        // Links report the target's metadata but keep their own name.
        let target = entry
            .alias_of
            .as_deref()
            .and_then(|t| self.entries.get(t))
            .unwrap_or(entry);
        RawEntry {
            name: name.to_string(),
            kind: target.kind,
            shape: target.shape.clone(),
            dtype: target.dtype,
            attributes: target.attributes.clone(),
            object_id: Some(entry.object_id),
        }
    }
}

impl ContainerSource for MemoryContainer {
    fn format_name(&self) -> &'static str {
        "memory"
    }

    fn root(&self) -> CatalogResult<RawEntry> {
        let (_, root) = self.entry(path::ROOT)?;
        Ok(self.raw_entry("", root))
    }

    fn children(&self, group_path: &str) -> CatalogResult<Vec<RawEntry>> {
        let (resolved, entry) = self.entry(group_path)?;
        if entry.kind != NodeKind::Group {
            return Err(CatalogError::WrongKind {
                path: group_path.to_string(),
                expected: "group",
            });
        }
        let children = self
            .entries
            .iter()
            .filter(|(p, _)| p.as_str() != path::ROOT && path::parent(p) == Some(resolved.as_str()))
            .map(|(p, e)| self.raw_entry(path::leaf(p), e))
            .collect();
        Ok(children)
    }

    fn read_f64(&self, dataset_path: &str, selection: &Selection) -> CatalogResult<ArrayChunk> {
        let (_, entry) = self.entry(dataset_path)?;
        let data = match (&entry.kind, &entry.payload) {
            (NodeKind::Dataset, Payload::Numeric(data)) => data,
            _ => {
                return Err(CatalogError::WrongKind {
                    path: dataset_path.to_string(),
                    expected: "numeric dataset",
                });
            }
        };
        let expected: usize = entry.shape.iter().product();
        if data.len() != expected {
            return Err(CatalogError::corrupted(
                dataset_path,
                format!("shape {:?} needs {expected} values, found {}", entry.shape, data.len()),
            ));
        }
        let sel = selection
            .resolve(&entry.shape)
            .map_err(|reason| CatalogError::InvalidSelection {
                path: dataset_path.to_string(),
                reason,
            })?;

        let mut out = Vec::with_capacity(sel.len());
        for r in sel.rows.clone() {
            let base = r * sel.row_width;
            out.extend_from_slice(&data[base + sel.cols.start..base + sel.cols.end]);
        }
        Ok(ArrayChunk::new(sel.out_shape, sel.rows.start, out))
    }

    fn read_strings(&self, dataset_path: &str, selection: &Selection) -> CatalogResult<Vec<String>> {
        let (_, entry) = self.entry(dataset_path)?;
        let values = match (&entry.kind, &entry.payload) {
            (NodeKind::Dataset, Payload::Text(values)) => values,
            _ => {
                return Err(CatalogError::WrongKind {
                    path: dataset_path.to_string(),
                    expected: "string dataset",
                });
            }
        };
        let sel = selection
            .resolve(&entry.shape)
            .map_err(|reason| CatalogError::InvalidSelection {
                path: dataset_path.to_string(),
                reason,
            })?;
        Ok(values
            .get(sel.rows.clone())
            .unwrap_or_default()
            .iter()
            .map(|s| s.trim().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_created_implicitly() {
        let src = MemoryContainer::new().dataset("/a/b/c", &[1], vec![1.0]);
        let root_children = src.children("/").unwrap();
        assert_eq!(root_children.len(), 1);
        assert_eq!(root_children[0].name, "a");
        assert_eq!(root_children[0].kind, NodeKind::Group);
    }

    #[test]
    fn link_reports_target_identity() {
        let src = MemoryContainer::new().group("/a").link("/a/loop", "/a");
        let a_id = src.children("/").unwrap()[0].object_id;
        let loop_entry = &src.children("/a").unwrap()[0];
        assert_eq!(loop_entry.name, "loop");
        assert_eq!(loop_entry.object_id, a_id);
        // Listing through the link shows the target's members.
        assert_eq!(src.children("/a/loop").unwrap().len(), 1);
    }

    #[test]
    fn short_payload_is_corruption() {
        let src = MemoryContainer::new().dataset("/d", &[4], vec![1.0, 2.0]);
        let err = src.read_f64("/d", &Selection::All).unwrap_err();
        assert!(matches!(err, CatalogError::CorruptedStructure { .. }));
    }

    #[test]
    fn strings_are_trimmed() {
        let src = MemoryContainer::new().strings("/names", ["Upstream  ", " Downstream"]);
        let names = src.read_strings("/names", &Selection::All).unwrap();
        assert_eq!(names, vec!["Upstream", "Downstream"]);
    }
}
