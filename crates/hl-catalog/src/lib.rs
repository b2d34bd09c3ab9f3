//! hl-catalog: lazy index over hierarchical model-result containers.
//!
//! Provides:
//! - `ContainerSource`, the seam to a physical container format
//! - `Catalog`, an immutable arena of node metadata built once per open
//! - `CatalogHandle` for listing, describing and slice-reading datasets
//! - `ChunkedReader` for bounded, cancelable bulk reads
//! - `HandleCache`, invalidated on file size/mtime change
//!
//! # Example
//!
//! ```
//! use hl_catalog::{CatalogHandle, MemoryContainer, Selection};
//! use hl_core::CancelToken;
//!
//! let source = MemoryContainer::new()
//!     .dataset("/Geometry/Points", &[3, 2], vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]);
//! let handle = CatalogHandle::from_source(source, &CancelToken::new()).unwrap();
//!
//! assert_eq!(handle.list("/Geometry").unwrap().len(), 1);
//! let chunk = handle.read_array("Geometry/Points", Some(&Selection::Rows(1..3))).unwrap();
//! assert_eq!(chunk.shape, vec![2, 2]);
//! ```

pub mod array;
pub mod builder;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod handle;
#[cfg(feature = "hdf5")]
pub mod hdf5_source;
pub mod info;
pub mod memory;
pub mod node;
pub mod path;
pub mod reader;
pub mod selection;
pub mod source;

// Re-exports for ergonomics
pub use array::ArrayChunk;
pub use builder::{CatalogBuilder, MAX_DEPTH, MAX_NODES};
pub use cache::{DEFAULT_CACHE_CAPACITY, FileStamp, HandleCache};
pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
pub use handle::{CatalogHandle, open, open_cancellable};
pub use info::{
    ContainerSummary, FileInfo, HydraulicDatasets, classify_hydraulic_datasets, file_info, summarize,
};
pub use memory::MemoryContainer;
pub use node::{AttrValue, CatalogNode, DType, NodeKind};
pub use reader::{ChunkedReader, DEFAULT_CHUNK_ROWS};
pub use selection::{ResolvedSelection, Selection};
pub use source::{ContainerSource, RawEntry};

/// Model-container extensions recognised by [`open`].
pub const CONTAINER_EXTENSIONS: &[&str] = &["hdf", "h5", "hdf5"];
