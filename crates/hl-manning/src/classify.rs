//! Roughness value bands and zone derivation from per-cell values.

use hl_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{ManningError, ManningResult};
use crate::resolve::{BaseEntry, BaseTable, UNASSIGNED};

/// Open interval of accepted Manning's n values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlausibleRange {
    pub min: Real,
    pub max: Real,
}

impl Default for PlausibleRange {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl PlausibleRange {
    pub fn contains(&self, v: Real) -> bool {
        v.is_finite() && v > self.min && v < self.max
    }
}

const BANDS: &[(Real, &str, &str)] = &[
    (0.020, "Very smooth", "Very smooth surface (concrete, asphalt)"),
    (0.030, "Smooth", "Smooth surface (lined channels)"),
    (0.040, "Moderate", "Moderate roughness (natural soil)"),
    (0.050, "Rough", "Rough surface (crops, pasture)"),
    (0.070, "Very rough", "Very rough surface (dense vegetation)"),
    (0.100, "Extremely rough", "Extremely rough surface (forest)"),
];

fn band(value: Real) -> Option<&'static (Real, &'static str, &'static str)> {
    BANDS.iter().find(|(upper, _, _)| value < *upper)
}

/// Short class name for a roughness value.
pub fn roughness_class(value: Real) -> &'static str {
    band(value).map_or("High resistance", |b| b.1)
}

pub fn roughness_description(value: Real) -> &'static str {
    band(value).map_or("High resistance surface (dense urban)", |b| b.2)
}

/// Zones derived from a per-cell roughness array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedZones {
    /// Zone code per cell; [`UNASSIGNED`] where the value was rejected.
    pub assignment: Vec<u32>,
    pub base_table: BaseTable,
    /// Cells whose value was rejected.
    pub rejected_cells: usize,
}

/// One zone per distinct accepted value, codes `1..` in ascending value
/// order, named by value band.
///
/// Values inside `range` are accepted. When none are, any positive finite
/// value is accepted instead.
pub fn zones_from_cell_values(values: &[Real], range: PlausibleRange) -> ManningResult<DerivedZones> {
    let strict = values.iter().any(|v| range.contains(*v));
    let accept = |v: Real| {
        if strict {
            range.contains(v)
        } else {
            v.is_finite() && v > 0.0
        }
    };

    let mut distinct: Vec<Real> = values.iter().copied().filter(|v| accept(*v)).collect();
    if distinct.is_empty() {
        return Err(ManningError::NoPlausibleValues {
            source_name: format!("{} cell values", values.len()),
        });
    }
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();

    let base_table: BaseTable = distinct
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as u32 + 1, BaseEntry::new(roughness_class(v), v)))
        .collect();

    let mut rejected_cells = 0;
    let assignment = values
        .iter()
        .map(|&v| {
            if !accept(v) {
                rejected_cells += 1;
                return UNASSIGNED;
            }
            // Present by construction.
            distinct
                .binary_search_by(|b| b.total_cmp(&v))
                .map_or(UNASSIGNED, |i| i as u32 + 1)
        })
        .collect();

    Ok(DerivedZones {
        assignment,
        base_table,
        rejected_cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands() {
        assert_eq!(roughness_class(0.012), "Very smooth");
        assert_eq!(roughness_class(0.035), "Moderate");
        assert_eq!(roughness_class(0.1), "High resistance");
        assert!(roughness_description(0.06).contains("vegetation"));
    }

    #[test]
    fn distinct_values_become_zones() {
        let values = [0.035, 0.06, 0.035, -1.0, f64::NAN, 0.013];
        let z = zones_from_cell_values(&values, PlausibleRange::default()).unwrap();
        assert_eq!(z.base_table.len(), 3);
        assert_eq!(z.base_table[&1].value, 0.013);
        assert_eq!(z.base_table[&3].value, 0.06);
        assert_eq!(z.assignment, vec![2, 3, 2, UNASSIGNED, UNASSIGNED, 1]);
        assert_eq!(z.rejected_cells, 2);
    }

    #[test]
    fn falls_back_to_any_positive_value() {
        let z = zones_from_cell_values(&[12.0, 12.0, 0.0], PlausibleRange::default()).unwrap();
        assert_eq!(z.base_table.len(), 1);
        assert_eq!(z.assignment, vec![1, 1, UNASSIGNED]);
    }

    #[test]
    fn nothing_usable() {
        assert!(zones_from_cell_values(&[0.0, -2.0], PlausibleRange::default()).is_err());
    }
}
