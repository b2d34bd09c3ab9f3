//! Zone resolution and calibration.

use std::collections::BTreeMap;

use hl_core::{ErrorKind, Real, ensure_same_len};
use hl_mesh::MeshGeometry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::{PlausibleRange, roughness_description};
use crate::error::{ManningError, ManningResult};

/// Zone code for cells without a roughness zone.
pub const UNASSIGNED: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEntry {
    pub name: String,
    pub value: Real,
}

impl BaseEntry {
    pub fn new(name: impl Into<String>, value: Real) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Base roughness per zone code.
pub type BaseTable = BTreeMap<u32, BaseEntry>;

/// Calibration of one zone: a replacement value or a factor on the base value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalibrationOverride {
    Absolute(Real),
    Scale(Real),
}

pub type CalibrationOverrides = BTreeMap<u32, CalibrationOverride>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManningZone {
    pub id: u32,
    pub name: String,
    pub base_value: Real,
    pub calibrated_value: Real,
    /// `calibrated_value / base_value`.
    pub calibration_factor: Real,
    /// Share of the mesh area, in `[0, 1]`.
    pub area_coverage: Real,
    pub cell_count: usize,
    pub description: String,
}

/// A zone present in the assignment that could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedZone {
    pub id: u32,
    pub cell_count: usize,
    pub area_coverage: Real,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManningResolution {
    pub zones: Vec<ManningZone>,
    pub unresolved: Vec<UnresolvedZone>,
    pub total_area: Real,
    /// Share of the mesh area in cells marked [`UNASSIGNED`].
    pub unassigned_coverage: Real,
}

impl ManningResolution {
    pub fn zone(&self, id: u32) -> Option<&ManningZone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn zone_named(&self, name: &str) -> Option<&ManningZone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn total_coverage(&self) -> Real {
        self.zones.iter().map(|z| z.area_coverage).sum()
    }
}

#[derive(Default)]
struct Tally {
    cells: usize,
    area: Real,
}

/// Resolve and calibrate every zone present in `assignment` (one code per
/// mesh cell).
///
/// Zones missing from `base_table`, with a non-positive base value or with
/// an override giving a non-positive value are returned in `unresolved`
/// instead of failing the whole call. Overrides for
/// zones not present in the assignment are ignored.
pub fn resolve(
    mesh: &MeshGeometry,
    assignment: &[u32],
    base_table: &BaseTable,
    overrides: Option<&CalibrationOverrides>,
    range: PlausibleRange,
) -> ManningResult<ManningResolution> {
    ensure_same_len("zone assignment", mesh.cell_count, assignment.len())?;
    ensure_same_len("cell areas", mesh.cell_count, mesh.cell_areas.len())?;
    let total_area: Real = mesh.cell_areas.iter().sum();
    if !(total_area > 0.0 && total_area.is_finite()) {
        return Err(ManningError::ZeroArea);
    }

    let mut tallies: BTreeMap<u32, Tally> = BTreeMap::new();
    for (&zone, &area) in assignment.iter().zip(&mesh.cell_areas) {
        let t = tallies.entry(zone).or_default();
        t.cells += 1;
        t.area += area;
    }

    if let Some(ov) = overrides {
        for id in ov.keys().filter(|id| !tallies.contains_key(id)) {
            warn!(zone = id, "calibration override for absent zone ignored");
        }
    }

    let mut zones = Vec::new();
    let mut unresolved = Vec::new();
    let mut unassigned_coverage = 0.0;

    for (id, tally) in tallies {
        let coverage = tally.area / total_area;
        if id == UNASSIGNED {
            unassigned_coverage = coverage;
            continue;
        }
        let Some(base) = base_table.get(&id) else {
            unresolved.push(UnresolvedZone {
                id,
                cell_count: tally.cells,
                area_coverage: coverage,
                kind: ErrorKind::DatasetMissing,
                reason: format!("zone {id} has no base table entry"),
            });
            continue;
        };
        if !(base.value > 0.0 && base.value.is_finite()) {
            unresolved.push(UnresolvedZone {
                id,
                cell_count: tally.cells,
                area_coverage: coverage,
                kind: ErrorKind::ComputationError,
                reason: format!("base value {} is not positive", base.value),
            });
            continue;
        }
        if !range.contains(base.value) {
            warn!(zone = id, value = base.value, "implausible base roughness");
        }

        let calibrated = match overrides.and_then(|o| o.get(&id)) {
            None => base.value,
            Some(CalibrationOverride::Absolute(v)) => *v,
            Some(CalibrationOverride::Scale(k)) => base.value * k,
        };
        if !(calibrated > 0.0 && calibrated.is_finite()) {
            let err = ManningError::InvalidOverride {
                zone: id,
                reason: format!("calibrated value {calibrated} is not positive"),
            };
            warn!(zone = id, error = %err, "zone left unresolved");
            unresolved.push(UnresolvedZone {
                id,
                cell_count: tally.cells,
                area_coverage: coverage,
                kind: err.kind(),
                reason: err.to_string(),
            });
            continue;
        }

        zones.push(ManningZone {
            id,
            name: base.name.clone(),
            base_value: base.value,
            calibrated_value: calibrated,
            calibration_factor: calibrated / base.value,
            area_coverage: coverage,
            cell_count: tally.cells,
            description: roughness_description(calibrated).to_string(),
        });
    }

    debug!(
        zones = zones.len(),
        unresolved = unresolved.len(),
        "manning zones resolved"
    );
    Ok(ManningResolution {
        zones,
        unresolved,
        total_area,
        unassigned_coverage,
    })
}
