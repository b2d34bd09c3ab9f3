//! CSV and JSON output for series, hydrographs, sections and roughness zones.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hl_core::{CancelToken, Real};
use hl_manning::ManningZone;
use hl_sections::CrossSection;
use hl_series::{Hydrograph, TimeSeries, TimeUnit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::job::{ExportJob, ExportSelection, TargetKind};
use crate::writer::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabularFormat {
    Csv,
    Json,
}

impl TabularFormat {
    /// Format implied by a `.csv` or `.json` extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(TabularFormat::Csv),
            "json" => Some(TabularFormat::Json),
            _ => None,
        }
    }
}

/// A tabular export payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "data")]
pub enum TabularData {
    TimeSeries(TimeSeries),
    Hydrograph(Hydrograph),
    CrossSections(Vec<CrossSection>),
    ManningZones(Vec<ManningZone>),
}

impl TabularData {
    fn selection(&self) -> ExportSelection {
        match self {
            TabularData::TimeSeries(s) => ExportSelection {
                variables: vec![s.variable.clone()],
                ..ExportSelection::default()
            },
            TabularData::Hydrograph(h) => ExportSelection {
                variables: vec![h.variable.clone()],
                ..ExportSelection::default()
            },
            TabularData::CrossSections(sections) => ExportSelection {
                sections: sections.iter().map(|s| s.id).collect(),
                ..ExportSelection::default()
            },
            TabularData::ManningZones(_) => ExportSelection {
                variables: vec!["manningN".to_string()],
                ..ExportSelection::default()
            },
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            TabularData::TimeSeries(s) => s.is_empty(),
            TabularData::Hydrograph(_) => false,
            TabularData::CrossSections(v) => v.is_empty(),
            TabularData::ManningZones(v) => v.is_empty(),
        }
    }
}

#[derive(Serialize)]
struct SeriesRow<'a> {
    source_name: &'a str,
    variable: &'a str,
    time_unit: TimeUnit,
    time: Real,
    value: Real,
    timestamp: Option<&'a str>,
}

#[derive(Serialize)]
struct HydrographRow<'a> {
    source_name: &'a str,
    variable: &'a str,
    time_unit: TimeUnit,
    peak_value: Real,
    peak_time: Real,
    peak_timestamp: Option<&'a str>,
    base_flow: Real,
    total_volume: Real,
    duration_hours: Real,
}

#[derive(Serialize)]
struct SectionRow {
    section_id: usize,
    station: Real,
    bearing: Real,
    offset: Real,
    x: Real,
    y: Real,
    elevation: Option<Real>,
    depth: Option<Real>,
    velocity: Option<Real>,
}

#[derive(Serialize)]
struct ZoneRow<'a> {
    zone_id: u32,
    name: &'a str,
    base_value: Real,
    calibrated_value: Real,
    calibration_factor: Real,
    area_coverage: Real,
    cell_count: usize,
    description: &'a str,
}

fn write_csv(path: &Path, data: &TabularData, cancel: &CancelToken) -> ExportResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    match data {
        TabularData::TimeSeries(s) => {
            for p in &s.points {
                wtr.serialize(SeriesRow {
                    source_name: &s.source_name,
                    variable: &s.variable,
                    time_unit: s.time_unit,
                    time: p.time,
                    value: p.value,
                    timestamp: p.timestamp.as_deref(),
                })?;
            }
        }
        TabularData::Hydrograph(h) => {
            wtr.serialize(HydrographRow {
                source_name: &h.source_name,
                variable: &h.variable,
                time_unit: h.time_unit,
                peak_value: h.peak_value,
                peak_time: h.peak_time,
                peak_timestamp: h.peak_timestamp.as_deref(),
                base_flow: h.base_flow,
                total_volume: h.total_volume,
                duration_hours: h.duration_hours,
            })?;
        }
        TabularData::CrossSections(sections) => {
            for section in sections {
                cancel.check()?;
                for s in &section.samples {
                    wtr.serialize(SectionRow {
                        section_id: section.id,
                        station: section.station,
                        bearing: section.bearing,
                        offset: s.offset,
                        x: s.x,
                        y: s.y,
                        elevation: s.elevation,
                        depth: s.depth,
                        velocity: s.velocity,
                    })?;
                }
            }
        }
        TabularData::ManningZones(zones) => {
            for z in zones {
                wtr.serialize(ZoneRow {
                    zone_id: z.id,
                    name: &z.name,
                    base_value: z.base_value,
                    calibrated_value: z.calibrated_value,
                    calibration_factor: z.calibration_factor,
                    area_coverage: z.area_coverage,
                    cell_count: z.cell_count,
                    description: &z.description,
                })?;
            }
        }
    }
    wtr.flush().map_err(ExportError::io(path))
}

fn write_json(path: &Path, data: &TabularData) -> ExportResult<()> {
    let file = File::create(path).map_err(ExportError::io(path))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, data)?;
    w.write_all(b"\n").map_err(ExportError::io(path))?;
    w.flush().map_err(ExportError::io(path))
}

/// Write `data` as CSV or JSON.
///
/// CSV has one row per time point, per section sample, or per zone, with a
/// header row. JSON is the pretty-printed `{"kind", "data"}` document.
pub fn export_tabular(
    data: &TabularData,
    format: TabularFormat,
    output: &Path,
    cancel: &CancelToken,
) -> ExportResult<ExportJob> {
    ExportJob::new(TargetKind::Tabular, data.selection(), output).run(|_| {
        if data.is_empty() {
            return Err(ExportError::InvalidRequest("nothing to export".to_string()));
        }
        debug!(?format, path = %output.display(), "writing table");
        write_atomic(output, cancel, |tmp| match format {
            TabularFormat::Csv => write_csv(tmp, data, cancel),
            TabularFormat::Json => write_json(tmp, data),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_from_extension() {
        assert_eq!(TabularFormat::from_path(&PathBuf::from("a/b.CSV")), Some(TabularFormat::Csv));
        assert_eq!(TabularFormat::from_path(&PathBuf::from("b.json")), Some(TabularFormat::Json));
        assert_eq!(TabularFormat::from_path(&PathBuf::from("b.txt")), None);
        assert_eq!(TabularFormat::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn empty_sections_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s.csv");
        let err = export_tabular(
            &TabularData::CrossSections(Vec::new()),
            TabularFormat::Csv,
            &out,
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), hl_core::ErrorKind::ComputationError);
        assert!(!out.exists());
    }
}
