//! Request shapes accepted at the pipeline boundary.
//!
//! Requests are JSON objects tagged by `op`, for example
//! `{"op": "hydrograph", "path": "model.hdf", "source": "bc:Upstream"}`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hl_core::Point2;
use hl_export::{RasterPolicy, TabularFormat};
use hl_manning::CalibrationOverride;
use hl_sections::RegimeMethod;
use hl_series::BaseFlowPolicy;
use serde::{Deserialize, Serialize};

/// Cell result variable read when a cross-section request asks for depths.
pub const DEFAULT_DEPTH_VARIABLE: &str = "Depth";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// File-system facts, without opening the container.
    FileInfo { path: PathBuf },
    /// Children of `group` (default `/`), or every descendant when
    /// `recursive`.
    Structure {
        path: PathBuf,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        recursive: bool,
    },
    Summary { path: PathBuf },
    Mesh {
        path: PathBuf,
        #[serde(default)]
        mesh_name: Option<String>,
    },
    Manning(ManningRequest),
    CrossSections(SectionRequest),
    ChannelAnalysis(ChannelRequest),
    TimeSeries(SeriesRequest),
    Hydrograph(HydrographRequest),
    BoundaryConditions { path: PathBuf },
    ExportMeshField(MeshFieldExportRequest),
    ExportRaster(RasterExportRequest),
    ExportTabular(TabularExportRequest),
    ExportSectionsGeoJson(SectionsGeoJsonRequest),
}

impl Request {
    /// The `op` tag.
    pub fn op(&self) -> &'static str {
        match self {
            Request::FileInfo { .. } => "fileInfo",
            Request::Structure { .. } => "structure",
            Request::Summary { .. } => "summary",
            Request::Mesh { .. } => "mesh",
            Request::Manning(_) => "manning",
            Request::CrossSections(_) => "crossSections",
            Request::ChannelAnalysis(_) => "channelAnalysis",
            Request::TimeSeries(_) => "timeSeries",
            Request::Hydrograph(_) => "hydrograph",
            Request::BoundaryConditions { .. } => "boundaryConditions",
            Request::ExportMeshField(_) => "exportMeshField",
            Request::ExportRaster(_) => "exportRaster",
            Request::ExportTabular(_) => "exportTabular",
            Request::ExportSectionsGeoJson(_) => "exportSectionsGeoJson",
        }
    }

    /// Export requests write files; everything else only reads.
    pub fn is_export(&self) -> bool {
        matches!(
            self,
            Request::ExportMeshField(_)
                | Request::ExportRaster(_)
                | Request::ExportTabular(_)
                | Request::ExportSectionsGeoJson(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDefinition {
    pub id: u32,
    pub name: String,
    pub value: f64,
}

/// Explicit zone input, replacing the roughness lookup in the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInput {
    /// Zone code per mesh cell; 0 marks unassigned cells.
    pub assignment: Vec<u32>,
    pub base_table: Vec<ZoneDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManningRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub mesh_name: Option<String>,
    /// Overrides keyed by zone id (`"3"`) or zone name (`"Channel"`).
    #[serde(default)]
    pub calibration: BTreeMap<String, CalibrationOverride>,
    #[serde(default)]
    pub zones: Option<ZoneInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequest {
    /// Model container supplying mesh elevations and cell results.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub mesh_name: Option<String>,
    /// Terrain raster; when given, elevations come from it.
    #[serde(default)]
    pub terrain: Option<PathBuf>,
    pub alignment: Vec<Point2>,
    pub spacing: f64,
    pub width: f64,
    #[serde(default)]
    pub intervals: Option<usize>,
    #[serde(default)]
    pub sample_step: Option<f64>,
    /// Result step to sample depth (and velocity) from.
    #[serde(default)]
    pub time_step: Option<usize>,
    #[serde(default)]
    pub depth_variable: Option<String>,
    #[serde(default)]
    pub velocity_variable: Option<String>,
}

/// Uniform-flow analysis of a trapezoidal channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRequest {
    pub discharge: f64,
    pub slope: f64,
    pub manning_n: f64,
    pub bottom_width: f64,
    /// Horizontal per vertical; 0 is rectangular.
    #[serde(default)]
    pub side_slope: f64,
    /// Observed depth; normal depth when absent.
    #[serde(default)]
    pub depth: Option<f64>,
    /// Observed velocity; `Q / A` at the analysed depth when absent.
    #[serde(default)]
    pub velocity: Option<f64>,
    #[serde(default)]
    pub bed_elevation: f64,
    /// Median grain size in millimetres. Scour and regime width are only
    /// reported when given.
    #[serde(default)]
    pub d50: Option<f64>,
    #[serde(default)]
    pub method: RegimeMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRequest {
    pub path: PathBuf,
    /// `bc:<name>`, `cell:<area>:<index>` or a dataset path.
    pub source: String,
    #[serde(default)]
    pub variable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrographRequest {
    pub path: PathBuf,
    pub source: String,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub base_flow: Option<BaseFlowPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshFieldExportRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub mesh_name: Option<String>,
    /// Cell result variables, e.g. `Depth`, `Water Surface`.
    pub variables: Vec<String>,
    /// Empty exports every stored step.
    #[serde(default)]
    pub time_steps: Vec<usize>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterExportRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub mesh_name: Option<String>,
    pub variable: String,
    /// Defaults to the last stored step.
    #[serde(default)]
    pub time_step: Option<usize>,
    pub resolution: f64,
    #[serde(default)]
    pub policy: Option<RasterPolicy>,
    pub output: PathBuf,
}

/// Run `request` and write its result as a table. The inner request must be
/// a time series, hydrograph, cross-section or Manning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularExportRequest {
    pub request: Box<Request>,
    pub output: PathBuf,
    /// Taken from the output extension when absent.
    #[serde(default)]
    pub format: Option<TabularFormat>,
}

/// Generate cross-sections and write them with their alignment as GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionsGeoJsonRequest {
    pub sections: SectionRequest,
    pub output: PathBuf,
    /// Coordinate system name; the mesh's when absent.
    #[serde(default)]
    pub crs: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_by_op() {
        let req: Request = serde_json::from_str(
            r#"{"op": "hydrograph", "path": "m.hdf", "source": "bc:Upstream", "baseFlow": "minimum"}"#,
        )
        .unwrap();
        assert_eq!(req.op(), "hydrograph");
        match req {
            Request::Hydrograph(h) => {
                assert_eq!(h.source, "bc:Upstream");
                assert_eq!(h.base_flow, Some(BaseFlowPolicy::Minimum));
                assert!(h.variable.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn struct_variants_use_camel_case_fields() {
        let req: Request =
            serde_json::from_str(r#"{"op": "mesh", "path": "m.hdf", "meshName": "Perimeter 1"}"#).unwrap();
        assert_eq!(
            req,
            Request::Mesh {
                path: PathBuf::from("m.hdf"),
                mesh_name: Some("Perimeter 1".into()),
            }
        );
    }

    #[test]
    fn channel_request_defaults() {
        let req: Request = serde_json::from_str(
            r#"{"op": "channelAnalysis", "discharge": 20, "slope": 0.001, "manningN": 0.03, "bottomWidth": 5}"#,
        )
        .unwrap();
        let Request::ChannelAnalysis(c) = req else {
            panic!("not a channel request");
        };
        assert_eq!(c.side_slope, 0.0);
        assert_eq!(c.method, RegimeMethod::Lacey);
        assert!(c.depth.is_none() && c.d50.is_none());
    }

    #[test]
    fn nested_tabular_request() {
        let req: Request = serde_json::from_str(
            r#"{"op": "exportTabular", "output": "q.csv",
                "request": {"op": "timeSeries", "path": "m.hdf", "source": "bc:Upstream"}}"#,
        )
        .unwrap();
        assert!(req.is_export());
        let Request::ExportTabular(t) = req else {
            panic!("not a tabular export");
        };
        assert_eq!(t.request.op(), "timeSeries");
        assert!(t.format.is_none());
    }

    #[test]
    fn manning_calibration_by_name_or_id() {
        let req: Request = serde_json::from_str(
            r#"{"op": "manning", "path": "m.hdf",
                "calibration": {"Channel": {"scale": 1.1}, "2": {"absolute": 0.08}},
                "zones": {"assignment": [1, 2, 0], "baseTable": [{"id": 1, "name": "Channel", "value": 0.035}]}}"#,
        )
        .unwrap();
        let Request::Manning(m) = req else {
            panic!("not a manning request");
        };
        assert_eq!(m.calibration.get("Channel"), Some(&CalibrationOverride::Scale(1.1)));
        assert_eq!(m.calibration.get("2"), Some(&CalibrationOverride::Absolute(0.08)));
        let zones = m.zones.unwrap();
        assert_eq!(zones.assignment, vec![1, 2, 0]);
        assert_eq!(zones.base_table[0].name, "Channel");
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"op": "simulate", "path": "m.hdf"}"#).is_err());
    }
}
