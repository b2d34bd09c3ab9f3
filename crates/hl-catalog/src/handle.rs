//! Open containers and query them through a shared handle.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hl_core::CancelToken;
use tracing::{debug, info};

use crate::CONTAINER_EXTENSIONS;
use crate::array::ArrayChunk;
use crate::builder::CatalogBuilder;
use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::node::{CatalogNode, DType};
use crate::path;
use crate::reader::ChunkedReader;
use crate::selection::Selection;
use crate::source::ContainerSource;

const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";
/// Offsets at which an HDF5 superblock may start (user block sizes).
const SIGNATURE_OFFSETS: &[u64] = &[0, 512, 1024, 2048, 4096];

/// Shared, cheaply clonable view of one opened container.
///
/// The catalog is built once per open; bulk payloads are only read through
/// [`CatalogHandle::read_array`] and [`ChunkedReader`].
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    source: Arc<dyn ContainerSource>,
    catalog: Arc<Catalog>,
    origin: Option<PathBuf>,
}

/// Open a model container from disk.
pub fn open(file_path: impl AsRef<Path>) -> CatalogResult<CatalogHandle> {
    open_cancellable(file_path, &CancelToken::new())
}

/// Open a model container, checking `cancel` while the catalog is built.
pub fn open_cancellable(
    file_path: impl AsRef<Path>,
    cancel: &CancelToken,
) -> CatalogResult<CatalogHandle> {
    let file_path = file_path.as_ref();
    if !file_path.is_file() {
        return Err(CatalogError::FileNotFound {
            path: file_path.to_path_buf(),
        });
    }

    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CatalogError::UnsupportedFormat {
            path: file_path.to_path_buf(),
            reason: format!("extension {ext:?} is not a model container"),
        });
    }
    if !has_hdf5_signature(file_path)? {
        return Err(CatalogError::UnsupportedFormat {
            path: file_path.to_path_buf(),
            reason: "missing HDF5 signature".to_string(),
        });
    }

    let source = open_backend(file_path)?;
    let mut handle = CatalogHandle::from_arc(source, cancel)?;
    handle.origin = Some(file_path.to_path_buf());
    info!(
        path = %file_path.display(),
        nodes = handle.catalog.len(),
        "container opened"
    );
    Ok(handle)
}

#[cfg(feature = "hdf5")]
fn open_backend(file_path: &Path) -> CatalogResult<Arc<dyn ContainerSource>> {
    Ok(Arc::new(crate::hdf5_source::Hdf5Source::open(file_path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_backend(file_path: &Path) -> CatalogResult<Arc<dyn ContainerSource>> {
    Err(CatalogError::UnsupportedFormat {
        path: file_path.to_path_buf(),
        reason: "built without the `hdf5` feature".to_string(),
    })
}

fn has_hdf5_signature(file_path: &Path) -> CatalogResult<bool> {
    let mut file = File::open(file_path)?;
    let len = file.metadata()?.len();
    let mut buf = [0u8; 8];
    for &offset in SIGNATURE_OFFSETS {
        if offset + 8 > len {
            break;
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        if &buf == HDF5_SIGNATURE {
            return Ok(true);
        }
    }
    Ok(false)
}

impl CatalogHandle {
    /// Index an already-open source.
    pub fn from_source(
        source: impl ContainerSource + 'static,
        cancel: &CancelToken,
    ) -> CatalogResult<Self> {
        Self::from_arc(Arc::new(source), cancel)
    }

    pub fn from_arc(source: Arc<dyn ContainerSource>, cancel: &CancelToken) -> CatalogResult<Self> {
        let catalog = CatalogBuilder::new().build(source.as_ref(), cancel)?;
        Ok(Self {
            source,
            catalog: Arc::new(catalog),
            origin: None,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// File this handle was opened from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn format_name(&self) -> &'static str {
        self.source.format_name()
    }

    /// Direct children of a group.
    pub fn list(&self, group_path: &str) -> CatalogResult<&[CatalogNode]> {
        self.catalog.children(group_path)
    }

    pub fn describe(&self, node_path: &str) -> CatalogResult<&CatalogNode> {
        self.catalog
            .get(node_path)
            .ok_or_else(|| CatalogError::missing(&path::normalize(node_path)))
    }

    pub fn exists(&self, node_path: &str) -> bool {
        self.catalog.contains(node_path)
    }

    /// Metadata of a dataset; groups fail with `DatasetMissing`.
    pub fn dataset(&self, dataset_path: &str) -> CatalogResult<&CatalogNode> {
        let node = self.describe(dataset_path)?;
        if !node.is_dataset() {
            return Err(CatalogError::WrongKind {
                path: node.path.clone(),
                expected: "dataset",
            });
        }
        Ok(node)
    }

    /// Read a numeric dataset, or the selected block of it.
    pub fn read_array(
        &self,
        dataset_path: &str,
        selection: Option<&Selection>,
    ) -> CatalogResult<ArrayChunk> {
        let node = self.dataset(dataset_path)?;
        if !node.dtype.is_some_and(DType::is_numeric) {
            return Err(CatalogError::WrongKind {
                path: node.path.clone(),
                expected: "numeric dataset",
            });
        }
        let selection = selection.cloned().unwrap_or_default();
        // Validate against catalogued metadata before touching the payload.
        selection
            .resolve(&node.shape)
            .map_err(|reason| CatalogError::InvalidSelection {
                path: node.path.clone(),
                reason,
            })?;
        debug!(path = %node.path, ?selection, "read array");
        self.source.read_f64(&node.path, &selection)
    }

    pub fn read_strings(
        &self,
        dataset_path: &str,
        selection: Option<&Selection>,
    ) -> CatalogResult<Vec<String>> {
        let node = self.dataset(dataset_path)?;
        let selection = selection.cloned().unwrap_or_default();
        self.source.read_strings(&node.path, &selection)
    }

    /// Stream a dataset in blocks of `rows_per_chunk` rows.
    pub fn chunks(
        &self,
        dataset_path: &str,
        rows_per_chunk: usize,
        cancel: &CancelToken,
    ) -> CatalogResult<ChunkedReader<'_>> {
        let node = self.dataset(dataset_path)?;
        ChunkedReader::new(self, node, rows_per_chunk, cancel.clone())
    }

    /// First attribute among `names` present on `node_path`, as text.
    pub fn attr_text(&self, node_path: &str, names: &[&str]) -> Option<String> {
        let node = self.catalog.get(node_path)?;
        names.iter().find_map(|n| match node.attr(n)? {
            crate::AttrValue::Text(s) => Some(s.trim().to_string()),
            other => other.as_f64().map(|v| v.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_core::ErrorKind;

    #[test]
    fn missing_file() {
        let err = open("/definitely/not/here.hdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, b"hello").unwrap();
        assert_eq!(open(&p).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn container_extension_without_signature() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("plan.p01.hdf");
        std::fs::write(&p, vec![0u8; 4096]).unwrap();
        assert_eq!(open(&p).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }
}
