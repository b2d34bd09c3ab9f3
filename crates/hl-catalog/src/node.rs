//! Catalog node metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a node holds children or array payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Dataset,
}

/// Semantic scalar type of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    Compound,
    Unknown,
}

impl DType {
    pub fn is_numeric(self) -> bool {
        !matches!(self, DType::String | DType::Compound | DType::Unknown)
    }
}

/// Attribute value. Only scalars and strings are catalogued; array-valued
/// attributes are left to direct dataset reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// One group or dataset in the container.
///
/// Immutable once catalogued; array payloads are never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    /// Canonical slash-separated path, `/` for the root.
    pub path: String,
    pub kind: NodeKind,
    /// Dimension sizes; empty for groups.
    pub shape: Vec<usize>,
    /// `None` for groups.
    pub dtype: Option<DType>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl CatalogNode {
    pub fn name(&self) -> &str {
        crate::path::leaf(&self.path)
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn is_dataset(&self) -> bool {
        self.kind == NodeKind::Dataset
    }

    /// Total element count (1 for rank-0 datasets, 0 for groups).
    pub fn element_count(&self) -> usize {
        match self.kind {
            NodeKind::Group => 0,
            NodeKind::Dataset => self.shape.iter().product(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}
