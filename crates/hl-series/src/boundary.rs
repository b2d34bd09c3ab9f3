use hl_catalog::CatalogHandle;
use serde::{Deserialize, Serialize};

use crate::layout;
use crate::source::TimeUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryKind {
    FlowHydrograph,
    StageHydrograph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryCondition {
    pub name: String,
    pub path: String,
    pub kind: BoundaryKind,
    pub time_steps: usize,
    pub time_unit: TimeUnit,
    /// Source name accepted by `extract_series`.
    pub source_name: String,
}

/// Boundary hydrographs stored in the container, flow before stage, each
/// in catalog order. Empty when the model has none.
pub fn list_boundary_conditions(handle: &CatalogHandle) -> Vec<BoundaryCondition> {
    let groups = [
        (layout::FLOW_HYDROGRAPHS, BoundaryKind::FlowHydrograph),
        (layout::STAGE_HYDROGRAPHS, BoundaryKind::StageHydrograph),
    ];
    let mut out = Vec::new();
    for (group, kind) in groups {
        let Ok(children) = handle.list(group) else {
            continue;
        };
        for node in children.iter().filter(|n| n.is_dataset()) {
            let time_unit = handle
                .attr_text(&node.path, layout::TIME_UNIT_ATTRS)
                .and_then(|t| TimeUnit::parse(&t))
                .unwrap_or(TimeUnit::Hours);
            out.push(BoundaryCondition {
                name: node.name().to_string(),
                path: node.path.clone(),
                kind,
                time_steps: node.shape.first().copied().unwrap_or(0),
                time_unit,
                source_name: format!("bc:{}", node.name()),
            });
        }
    }
    out
}
