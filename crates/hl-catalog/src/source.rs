//! The seam between the catalog and a physical container format.

use std::collections::BTreeMap;
use std::fmt;

use crate::array::ArrayChunk;
use crate::error::CatalogResult;
use crate::node::{AttrValue, DType, NodeKind};
use crate::selection::Selection;

/// Metadata for one child as reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub name: String,
    pub kind: NodeKind,
    pub shape: Vec<usize>,
    pub dtype: Option<DType>,
    pub attributes: BTreeMap<String, AttrValue>,
    /// Backend object identity, when the format exposes one. Two entries
    /// with the same id are the same object reached through different links.
    pub object_id: Option<u64>,
}

impl RawEntry {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            shape: Vec::new(),
            dtype: None,
            attributes: BTreeMap::new(),
            object_id: None,
        }
    }
}

/// A hierarchical container that can be listed and slice-read.
///
/// Implementations must be safe for concurrent readers. Paths passed in
/// are canonical (see [`crate::path`]).
pub trait ContainerSource: Send + Sync + fmt::Debug {
    /// Short format name for diagnostics (`"hdf5"`, `"memory"`).
    fn format_name(&self) -> &'static str;

    /// Root group metadata (name is ignored).
    fn root(&self) -> CatalogResult<RawEntry>;

    /// Direct children of a group. Metadata only: no payload is read.
    fn children(&self, group_path: &str) -> CatalogResult<Vec<RawEntry>>;

    /// Read a numeric dataset block converted to `f64`.
    fn read_f64(&self, dataset_path: &str, selection: &Selection) -> CatalogResult<ArrayChunk>;

    /// Read a string dataset (rank 0 or 1), trimmed.
    fn read_strings(&self, dataset_path: &str, selection: &Selection)
    -> CatalogResult<Vec<String>>;
}
