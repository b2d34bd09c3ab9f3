//! File metadata and catalog-level summaries.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::FileStamp;
use crate::catalog::Catalog;
use crate::error::CatalogResult;

const FLOW_AREAS_GROUP: &str = "/Geometry/2D Flow Areas";
const UNSTEADY_RESULTS: &str = "/Results/Unsteady";
const OUTPUT_BLOCKS: &str = "/Results/Unsteady/Output/Output Blocks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    /// RFC 3339, UTC.
    pub modified: Option<String>,
    pub extension: Option<String>,
}

/// Basic file-system facts; does not open the container.
pub fn file_info(file_path: &Path) -> CatalogResult<FileInfo> {
    let stamp = FileStamp::of(file_path)?;
    let modified = stamp.modified.map(|t| {
        DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
    });
    Ok(FileInfo {
        name: file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: file_path.display().to_string(),
        size_bytes: stamp.len,
        size_mb: (stamp.len as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        modified,
        extension: file_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase()),
    })
}

/// Dataset paths grouped by the hydraulic quantity their names suggest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydraulicDatasets {
    pub depth: Vec<String>,
    pub velocity: Vec<String>,
    pub water_surface: Vec<String>,
    pub flow: Vec<String>,
    pub other: Vec<String>,
}

/// Classify every dataset by keywords in its name, first match wins in the
/// order depth, velocity, water surface, flow.
pub fn classify_hydraulic_datasets(catalog: &Catalog) -> HydraulicDatasets {
    let mut out = HydraulicDatasets::default();
    for node in catalog.datasets() {
        let lower = node.name().to_lowercase();
        let bucket = if lower.contains("depth") {
            &mut out.depth
        } else if lower.split_whitespace().any(|w| w.starts_with("vel")) {
            &mut out.velocity
        } else if lower.contains("water surface") || lower.contains("wse") {
            &mut out.water_surface
        } else if lower.contains("flow") || lower.contains("discharge") {
            &mut out.flow
        } else {
            &mut out.other
        };
        bucket.push(node.path.clone());
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub total_groups: usize,
    pub total_datasets: usize,
    /// Largest first dimension among datasets of rank >= 2.
    pub max_time_steps: usize,
    /// Largest second dimension among datasets of rank >= 2.
    pub max_cells: usize,
    pub flow_areas: Vec<String>,
    pub has_unsteady_results: bool,
    pub output_blocks: usize,
}

pub fn summarize(catalog: &Catalog) -> ContainerSummary {
    let mut max_time_steps = 0;
    let mut max_cells = 0;
    for node in catalog.datasets() {
        if let [steps, cells, ..] = node.shape.as_slice() {
            max_time_steps = max_time_steps.max(*steps);
            max_cells = max_cells.max(*cells);
        }
    }

    let flow_areas: BTreeSet<String> = catalog
        .children(FLOW_AREAS_GROUP)
        .map(|nodes| {
            nodes
                .iter()
                .filter(|n| n.is_group())
                .map(|n| n.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    ContainerSummary {
        // Root excluded.
        total_groups: catalog.groups().count().saturating_sub(1),
        total_datasets: catalog.datasets().count(),
        max_time_steps,
        max_cells,
        flow_areas: flow_areas.into_iter().collect(),
        has_unsteady_results: catalog.contains(UNSTEADY_RESULTS),
        output_blocks: catalog
            .children(OUTPUT_BLOCKS)
            .map(|c| c.len())
            .unwrap_or(0),
    }
}
