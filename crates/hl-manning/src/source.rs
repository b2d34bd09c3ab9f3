//! Locating per-cell roughness arrays in model and land-cover containers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hl_catalog::{AttrValue, CatalogHandle, CatalogNode, DEFAULT_CHUNK_ROWS};
use hl_core::{CancelToken, Real};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::PlausibleRange;
use crate::error::{ManningError, ManningResult};

/// Per-area candidates; `{area}` is replaced by the flow-area name.
const AREA_CANDIDATES: &[&str] = &[
    "/Geometry/2D Flow Areas/{area}/Cells Center Manning's n",
    "/Geometry/2D Flow Areas/{area}/Manning's n",
    "/Geometry/2D Flow Areas/{area}/Cell Manning's n",
    "/Geometry/2D Flow Areas/{area}/Cell Center Manning's n",
    "/Geometry/2D Flow Areas/{area}/Cells Manning's n",
    "/Results/Unsteady/Output/Output Blocks/Base Output/Summary Output/2D Flow Areas/{area}/Manning's n",
];

const SHARED_CANDIDATES: &[&str] = &[
    "/Geometry/Land Cover (Manning's n)/Manning's n Values",
    "/Geometry/Land Cover/Manning's n Values",
    "/Geometry/Land Cover/Manning n",
    "/Geometry/Manning's n",
    "/Geometry/2D Flow Areas/Manning's n",
];

/// Candidates inside a land-cover sidecar container.
const LANDCOVER_CANDIDATES: &[&str] = &[
    "/ManningsN",
    "/Manning's N",
    "/Manning_N",
    "/Variables/Manning's N",
    "/Variables/ManningsN",
    "/Raster Map/Manning's N",
];

const KEYWORDS: &[&str] = &["manning", "roughness", "land cover"];

/// A roughness array and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoughnessArray {
    pub path: String,
    pub values: Vec<Real>,
    pub plausible_count: usize,
}

fn looks_like_roughness(node: &CatalogNode) -> bool {
    let name = node.name().to_lowercase();
    KEYWORDS.iter().any(|k| name.contains(k)) || name.ends_with(" n")
}

fn try_read(
    handle: &CatalogHandle,
    path: &str,
    range: PlausibleRange,
    cancel: &CancelToken,
) -> ManningResult<Option<RoughnessArray>> {
    let Ok(node) = handle.dataset(path) else {
        return Ok(None);
    };
    if !node.dtype.is_some_and(|d| d.is_numeric()) || node.element_count() == 0 {
        return Ok(None);
    }
    let values = handle
        .chunks(&node.path, DEFAULT_CHUNK_ROWS, cancel)?
        .collect_all()?
        .data;
    let plausible_count = values.iter().filter(|v| range.contains(**v)).count();
    if plausible_count == 0 {
        debug!(path, "candidate has no plausible roughness values");
        return Ok(None);
    }
    Ok(Some(RoughnessArray {
        path: node.path.clone(),
        values,
        plausible_count,
    }))
}

fn search(
    handle: &CatalogHandle,
    fixed: impl IntoIterator<Item = String>,
    range: PlausibleRange,
    cancel: &CancelToken,
) -> ManningResult<RoughnessArray> {
    let mut searched = 0;
    for path in fixed {
        searched += 1;
        if let Some(found) = try_read(handle, &path, range, cancel)? {
            info!(path = %found.path, "roughness array found");
            return Ok(found);
        }
    }

    let keyword_hits: Vec<String> = handle
        .catalog()
        .datasets()
        .filter(|n| looks_like_roughness(n))
        .map(|n| n.path.clone())
        .collect();
    for path in keyword_hits {
        searched += 1;
        cancel.check()?;
        if let Some(found) = try_read(handle, &path, range, cancel)? {
            info!(path = %found.path, "roughness array found by keyword");
            return Ok(found);
        }
    }
    Err(ManningError::NoRoughnessData { searched })
}

/// Find a per-cell roughness array for `area` (or any area).
///
/// Known locations are tried first, then every dataset whose name mentions
/// roughness. An array is accepted when at least one value is plausible.
pub fn read_cell_roughness(
    handle: &CatalogHandle,
    area: Option<&str>,
    range: PlausibleRange,
    cancel: &CancelToken,
) -> ManningResult<RoughnessArray> {
    let mut fixed: Vec<String> = Vec::new();
    if let Some(area) = area {
        fixed.extend(AREA_CANDIDATES.iter().map(|c| c.replace("{area}", area)));
    }
    fixed.extend(SHARED_CANDIDATES.iter().map(|c| c.to_string()));
    search(handle, fixed, range, cancel)
}

/// Roughness array of a land-cover sidecar container.
pub fn read_landcover_roughness(
    handle: &CatalogHandle,
    range: PlausibleRange,
    cancel: &CancelToken,
) -> ManningResult<RoughnessArray> {
    search(
        handle,
        LANDCOVER_CANDIDATES.iter().map(|c| c.to_string()),
        range,
        cancel,
    )
}

/// Existing land-cover sidecar files next to `main_path`, most specific
/// first. `geometry_attrs` are the attributes of the model's `/Geometry`
/// group (`Land Cover Layername`, `Land Cover Filename`).
pub fn landcover_sidecars(main_path: &Path, geometry_attrs: &BTreeMap<String, AttrValue>) -> Vec<PathBuf> {
    let dir = main_path.parent().unwrap_or_else(|| Path::new("."));
    let mut names: Vec<String> = Vec::new();

    if let Some(layer) = geometry_attrs.get("Land Cover Layername").and_then(AttrValue::as_str) {
        let layer = layer.trim();
        if !layer.is_empty() {
            names.push(format!("{layer}.hdf"));
            names.push(format!("{layer}.hdf5"));
        }
    }
    if let Some(file) = geometry_attrs.get("Land Cover Filename").and_then(AttrValue::as_str) {
        let file = Path::new(file.trim());
        if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
            names.push(format!("{stem}.hdf"));
        }
    }
    names.extend(
        ["LandCover.hdf", "LandCover.hdf5", "landcover.hdf", "Manning.hdf", "manning.hdf"]
            .iter()
            .map(|s| s.to_string()),
    );

    let mut out: Vec<PathBuf> = Vec::new();
    for name in names {
        let candidate = dir.join(name);
        if candidate.is_file() && candidate != main_path && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_catalog::MemoryContainer;
    use hl_core::ErrorKind;

    fn handle(src: MemoryContainer) -> CatalogHandle {
        CatalogHandle::from_source(src, &CancelToken::new()).unwrap()
    }

    #[test]
    fn known_path_preferred() {
        let h = handle(
            MemoryContainer::new()
                .dataset("/Geometry/2D Flow Areas/A/Cells Center Manning's n", &[3], vec![0.03, 0.05, 0.03])
                .dataset("/Geometry/Other Roughness", &[1], vec![0.2]),
        );
        let found = read_cell_roughness(&h, Some("A"), PlausibleRange::default(), &CancelToken::new()).unwrap();
        assert_eq!(found.path, "/Geometry/2D Flow Areas/A/Cells Center Manning's n");
        assert_eq!(found.plausible_count, 3);
    }

    #[test]
    fn keyword_search_skips_implausible_arrays() {
        let h = handle(
            MemoryContainer::new()
                .dataset("/Geometry/Roughness IDs", &[2], vec![-1.0, 0.0])
                .dataset("/Geometry/Land Cover Values", &[2], vec![0.04, 0.08]),
        );
        let found = read_cell_roughness(&h, None, PlausibleRange::default(), &CancelToken::new()).unwrap();
        assert_eq!(found.path, "/Geometry/Land Cover Values");
    }

    #[test]
    fn nothing_found() {
        let h = handle(MemoryContainer::new().dataset("/Geometry/Elevation", &[1], vec![1.0]));
        let err = read_cell_roughness(&h, Some("A"), PlausibleRange::default(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DatasetMissing);
    }

    #[test]
    fn landcover_layout() {
        let h = handle(MemoryContainer::new().dataset("/Variables/ManningsN", &[2], vec![0.035, 0.1]));
        let found = read_landcover_roughness(&h, PlausibleRange::default(), &CancelToken::new()).unwrap();
        assert_eq!(found.values, vec![0.035, 0.1]);
    }

    #[test]
    fn sidecars_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("Model.p01.hdf");
        std::fs::write(&main, b"").unwrap();
        std::fs::write(dir.path().join("LandCover.hdf"), b"").unwrap();
        std::fs::write(dir.path().join("NLCD_2019.hdf"), b"").unwrap();

        let mut attrs = BTreeMap::new();
        attrs.insert("Land Cover Layername".to_string(), AttrValue::from("NLCD_2019"));
        let found = landcover_sidecars(&main, &attrs);
        assert_eq!(
            found,
            vec![dir.path().join("NLCD_2019.hdf"), dir.path().join("LandCover.hdf")]
        );
        assert!(landcover_sidecars(&main, &BTreeMap::new()).len() == 1);
    }
}
