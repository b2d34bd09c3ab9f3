//! HDF5 backend (feature `hdf5`).
//!
//! The library handle is opened once; every read reopens the addressed
//! object from the file, so concurrent readers never share cursor state.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::path::{Path, PathBuf};

use hdf5::types::{FixedAscii, FixedUnicode, FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group, H5Type, Hyperslab, LocationType, SliceOrIndex};
use tracing::warn;

use crate::array::ArrayChunk;
use crate::error::{CatalogError, CatalogResult};
use crate::node::{AttrValue, DType, NodeKind};
use crate::path;
use crate::selection::Selection;
use crate::source::{ContainerSource, RawEntry};

const FIXED_STR_LEN: usize = 1024;

pub struct Hdf5Source {
    file: File,
    path: PathBuf,
}

impl fmt::Debug for Hdf5Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hdf5Source").field("path", &self.path).finish()
    }
}

fn backend(e: hdf5::Error) -> CatalogError {
    CatalogError::Backend(e.to_string())
}

impl Hdf5Source {
    pub fn open(file_path: &Path) -> CatalogResult<Self> {
        let file = File::open(file_path).map_err(|e| CatalogError::UnsupportedFormat {
            path: file_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            file,
            path: file_path.to_path_buf(),
        })
    }

    fn group(&self, group_path: &str) -> CatalogResult<Group> {
        if group_path == path::ROOT {
            return self.file.group("/").map_err(backend);
        }
        self.file
            .group(group_path)
            .map_err(|_| CatalogError::missing(group_path))
    }

    fn dataset(&self, dataset_path: &str) -> CatalogResult<Dataset> {
        self.file
            .dataset(dataset_path)
            .map_err(|_| CatalogError::missing(dataset_path))
    }
}

fn dtype_of(desc: &TypeDescriptor) -> DType {
    match desc {
        TypeDescriptor::Integer(IntSize::U1) => DType::Int8,
        TypeDescriptor::Integer(IntSize::U2) => DType::Int16,
        TypeDescriptor::Integer(IntSize::U4) => DType::Int32,
        TypeDescriptor::Integer(IntSize::U8) => DType::Int64,
        TypeDescriptor::Unsigned(IntSize::U1) => DType::UInt8,
        TypeDescriptor::Unsigned(IntSize::U2) => DType::UInt16,
        TypeDescriptor::Unsigned(IntSize::U4) => DType::UInt32,
        TypeDescriptor::Unsigned(IntSize::U8) => DType::UInt64,
        TypeDescriptor::Float(FloatSize::U4) => DType::Float32,
        TypeDescriptor::Float(FloatSize::U8) => DType::Float64,
        TypeDescriptor::Boolean => DType::Bool,
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => DType::String,
        TypeDescriptor::Compound(_) => DType::Compound,
        _ => DType::Unknown,
    }
}

fn read_attributes(loc: &hdf5::Location) -> BTreeMap<String, AttrValue> {
    let mut out = BTreeMap::new();
    let Ok(names) = loc.attr_names() else {
        return out;
    };
    for name in names {
        match loc.attr(&name).map(|a| read_attr(&a)) {
            Ok(Some(value)) => {
                out.insert(name, value);
            }
            Ok(None) => {}
            Err(e) => warn!(attr = %name, error = %e, "unreadable attribute skipped"),
        }
    }
    out
}

/// File number plus object token: equal for every link to the same object.
fn object_id(loc: &hdf5::Location) -> Option<u64> {
    let info = loc.loc_info().ok()?;
    let mut hasher = DefaultHasher::new();
    info.fileno.hash(&mut hasher);
    format!("{:?}", info.token).hash(&mut hasher);
    Some(hasher.finish())
}

/// Rows of a rank >= 3 dataset, read as one 2-D hyperslab per leading
/// index so only the selected rows leave the file.
fn read_leading_rows(ds: &Dataset, shape: &[usize], rows: Range<usize>) -> hdf5::Result<Vec<f64>> {
    let rank = shape.len();
    let (outer, tail) = shape[1..].split_at(rank - 3);
    let per_row: usize = shape[1..].iter().product();
    if per_row == 0 {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(rows.len() * per_row);
    let mut index = vec![0usize; outer.len()];
    for row in rows {
        loop {
            let mut elems = Vec::with_capacity(rank);
            elems.push(SliceOrIndex::from(row));
            elems.extend(index.iter().map(|&i| SliceOrIndex::from(i)));
            elems.push(SliceOrIndex::from(0..tail[0]));
            elems.push(SliceOrIndex::from(0..tail[1]));
            let block = ds.read_slice_2d::<f64, _>(Hyperslab::from(elems))?;
            out.extend(block.iter().copied());

            // Odometer over the middle axes, last axis fastest.
            let mut axis = outer.len();
            loop {
                if axis == 0 {
                    break;
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < outer[axis] {
                    break;
                }
                index[axis] = 0;
            }
            if index.iter().all(|&i| i == 0) {
                break;
            }
        }
    }
    Ok(out)
}

fn read_text<T: H5Type>(
    ds: &Dataset,
    rows: Option<Range<usize>>,
    text: fn(&T) -> &str,
) -> hdf5::Result<Vec<String>> {
    let trimmed = |s: &T| text(s).trim().to_string();
    Ok(match rows {
        None => ds.read_raw::<T>()?.iter().map(trimmed).collect(),
        Some(rows) => ds.read_slice_1d::<T, _>(rows)?.iter().map(trimmed).collect(),
    })
}

/// Scalar (or single-element) attributes only.
fn read_attr(attr: &hdf5::Attribute) -> Option<AttrValue> {
    if attr.size() != 1 {
        return None;
    }
    let desc = attr.dtype().ok()?.to_descriptor().ok()?;
    match desc {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Boolean => {
            attr.read_raw::<i64>().ok()?.first().map(|v| AttrValue::Int(*v))
        }
        TypeDescriptor::Float(_) => attr.read_raw::<f64>().ok()?.first().map(|v| AttrValue::Float(*v)),
        TypeDescriptor::FixedAscii(_) => attr
            .read_raw::<FixedAscii<FIXED_STR_LEN>>()
            .ok()?
            .first()
            .map(|s| AttrValue::Text(s.as_str().trim().to_string())),
        TypeDescriptor::FixedUnicode(_) => attr
            .read_raw::<FixedUnicode<FIXED_STR_LEN>>()
            .ok()?
            .first()
            .map(|s| AttrValue::Text(s.as_str().trim().to_string())),
        TypeDescriptor::VarLenAscii => attr
            .read_raw::<VarLenAscii>()
            .ok()?
            .first()
            .map(|s| AttrValue::Text(s.as_str().trim().to_string())),
        TypeDescriptor::VarLenUnicode => attr
            .read_raw::<VarLenUnicode>()
            .ok()?
            .first()
            .map(|s| AttrValue::Text(s.as_str().trim().to_string())),
        _ => None,
    }
}

impl ContainerSource for Hdf5Source {
    fn format_name(&self) -> &'static str {
        "hdf5"
    }

    fn root(&self) -> CatalogResult<RawEntry> {
        let root = self.group(path::ROOT)?;
        let mut entry = RawEntry::group("");
        entry.attributes = read_attributes(&root);
        entry.object_id = object_id(&root);
        Ok(entry)
    }

    fn children(&self, group_path: &str) -> CatalogResult<Vec<RawEntry>> {
        let group = self.group(group_path)?;
        let names = group.member_names().map_err(backend)?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            match group.loc_type_by_name(&name) {
                Ok(LocationType::Group) => {
                    let child = group.group(&name).map_err(backend)?;
                    let mut entry = RawEntry::group(name);
                    entry.attributes = read_attributes(&child);
                    entry.object_id = object_id(&child);
                    out.push(entry);
                }
                Ok(LocationType::Dataset) => {
                    let ds = group.dataset(&name).map_err(backend)?;
                    let dtype = ds
                        .dtype()
                        .and_then(|t| t.to_descriptor())
                        .map(|d| dtype_of(&d))
                        .unwrap_or(DType::Unknown);
                    out.push(RawEntry {
                        name,
                        kind: NodeKind::Dataset,
                        shape: ds.shape(),
                        dtype: Some(dtype),
                        attributes: read_attributes(&ds),
                        object_id: object_id(&ds),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(CatalogError::corrupted(
                        &path::join(group_path, &name),
                        e.to_string(),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn read_f64(&self, dataset_path: &str, selection: &Selection) -> CatalogResult<ArrayChunk> {
        let ds = self.dataset(dataset_path)?;
        let shape = ds.shape();
        let sel = selection
            .resolve(&shape)
            .map_err(|reason| CatalogError::InvalidSelection {
                path: dataset_path.to_string(),
                reason,
            })?;

        let data: Vec<f64> = match (selection, shape.len()) {
            (Selection::All, _) => ds.read_raw::<f64>().map_err(backend)?,
            (_, 1) => ds
                .read_slice_1d::<f64, _>(sel.rows.clone())
                .map_err(backend)?
                .iter()
                .copied()
                .collect(),
            (_, 2) => ds
                .read_slice_2d::<f64, _>((sel.rows.clone(), sel.cols.clone()))
                .map_err(backend)?
                .iter()
                .copied()
                .collect(),
            (_, 0) => ds.read_raw::<f64>().map_err(backend)?,
            _ => read_leading_rows(&ds, &shape, sel.rows.clone()).map_err(backend)?,
        };
        if data.len() != sel.out_shape.iter().product::<usize>() {
            return Err(CatalogError::corrupted(dataset_path, "payload shorter than shape"));
        }
        Ok(ArrayChunk::new(sel.out_shape, sel.rows.start, data))
    }

    fn read_strings(&self, dataset_path: &str, selection: &Selection) -> CatalogResult<Vec<String>> {
        let ds = self.dataset(dataset_path)?;
        let sel = selection
            .resolve(&ds.shape())
            .map_err(|reason| CatalogError::InvalidSelection {
                path: dataset_path.to_string(),
                reason,
            })?;
        let desc = ds.dtype().and_then(|t| t.to_descriptor()).map_err(backend)?;
        let rank = ds.shape().len();
        let rows = (rank == 1).then(|| sel.rows.clone());
        let strings = match desc {
            TypeDescriptor::FixedAscii(_) => {
                read_text(&ds, rows, FixedAscii::<FIXED_STR_LEN>::as_str)
            }
            TypeDescriptor::FixedUnicode(_) => {
                read_text(&ds, rows, FixedUnicode::<FIXED_STR_LEN>::as_str)
            }
            TypeDescriptor::VarLenAscii => read_text(&ds, rows, VarLenAscii::as_str),
            TypeDescriptor::VarLenUnicode => read_text(&ds, rows, VarLenUnicode::as_str),
            _ => {
                return Err(CatalogError::WrongKind {
                    path: dataset_path.to_string(),
                    expected: "string dataset",
                });
            }
        };
        let strings = strings.map_err(backend)?;
        if rank <= 1 {
            return Ok(strings);
        }
        let start = sel.rows.start * sel.row_width;
        let end = sel.rows.end * sel.row_width;
        strings
            .get(start..end)
            .map(<[String]>::to_vec)
            .ok_or_else(|| CatalogError::corrupted(dataset_path, "payload shorter than shape"))
    }
}
