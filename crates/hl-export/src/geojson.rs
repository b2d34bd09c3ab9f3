//! Alignment and cross-section lines as a GeoJSON `FeatureCollection`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hl_core::{CancelToken, Point2};
use hl_sections::{AlignmentCurve, CrossSection};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::job::{ExportJob, ExportSelection, TargetKind};
use crate::writer::write_atomic;

/// Vertices used to trace the smoothed alignment.
pub const ALIGNMENT_VERTICES: usize = 200;

fn coords(points: impl IntoIterator<Item = Point2>) -> Value {
    Value::Array(points.into_iter().map(|p| json!([p.x, p.y])).collect())
}

/// Build the collection: one `alignment` feature tracing the curve through
/// `alignment`, then one `crossSection` feature per section running from its
/// left to its right end. `crs` becomes a named-CRS member when given.
pub fn sections_feature_collection(
    alignment: &[Point2],
    sections: &[CrossSection],
    crs: Option<&str>,
) -> ExportResult<Value> {
    let curve = AlignmentCurve::new(alignment)?;
    let total = curve.total_length();
    let trace = (0..=ALIGNMENT_VERTICES).map(|i| curve.point_at(total * i as f64 / ALIGNMENT_VERTICES as f64));

    let mut features = Vec::with_capacity(sections.len() + 1);
    features.push(json!({
        "type": "Feature",
        "geometry": {"type": "LineString", "coordinates": coords(trace)},
        "properties": {"kind": "alignment", "length": total, "controlPoints": alignment.len()},
    }));
    for s in sections {
        let max_depth = s
            .samples
            .iter()
            .filter_map(|p| p.depth)
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
        features.push(json!({
            "type": "Feature",
            "geometry": {"type": "LineString", "coordinates": coords([s.left, s.center, s.right])},
            "properties": {
                "kind": "crossSection",
                "id": s.id,
                "station": s.station,
                "bearing": s.bearing,
                "width": s.width(),
                "samples": s.samples.len(),
                "maxDepth": max_depth,
            },
        }));
    }

    let mut collection = json!({"type": "FeatureCollection", "features": features});
    if let Some(name) = crs.filter(|c| !c.is_empty()) {
        collection["crs"] = json!({"type": "name", "properties": {"name": name}});
    }
    Ok(collection)
}

/// Write the alignment and sections to a `.geojson` (or `.json`) file.
pub fn export_sections_geojson(
    alignment: &[Point2],
    sections: &[CrossSection],
    crs: Option<&str>,
    output: &Path,
    cancel: &CancelToken,
) -> ExportResult<ExportJob> {
    let selection = ExportSelection {
        sections: sections.iter().map(|s| s.id).collect(),
        ..ExportSelection::default()
    };
    ExportJob::new(TargetKind::GeoJson, selection, output).run(|_| {
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if ext != "geojson" && ext != "json" {
            return Err(ExportError::UnsupportedTarget {
                path: output.to_path_buf(),
                reason: "section lines are written as .geojson".to_string(),
            });
        }
        if sections.is_empty() {
            return Err(ExportError::InvalidRequest("no cross-sections to export".to_string()));
        }
        let collection = sections_feature_collection(alignment, sections, crs)?;
        debug!(sections = sections.len(), path = %output.display(), "writing geojson");
        write_atomic(output, cancel, |tmp| {
            let file = File::create(tmp).map_err(ExportError::io(tmp))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, &collection)?;
            w.write_all(b"\n").map_err(ExportError::io(tmp))?;
            w.flush().map_err(ExportError::io(tmp))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_sections::SectionSample;

    fn section(id: usize, x: f64, depth: Option<f64>) -> CrossSection {
        let sample = |offset: f64| SectionSample {
            offset,
            x,
            y: -offset,
            elevation: Some(1.0),
            depth,
            velocity: None,
        };
        CrossSection {
            id,
            station: x,
            center: Point2::new(x, 0.0),
            bearing: 180.0,
            left: Point2::new(x, 5.0),
            right: Point2::new(x, -5.0),
            samples: vec![sample(-5.0), sample(0.0), sample(5.0)],
        }
    }

    #[test]
    fn features_in_order() {
        let line = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let fc = sections_feature_collection(
            &line,
            &[section(1, 0.0, Some(1.5)), section(2, 100.0, None)],
            Some("EPSG:32614"),
        )
        .unwrap();

        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["crs"]["properties"]["name"], "EPSG:32614");
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);

        let alignment = &features[0];
        assert_eq!(alignment["properties"]["kind"], "alignment");
        assert!((alignment["properties"]["length"].as_f64().unwrap() - 100.0).abs() < 1e-9);
        let trace = alignment["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(trace.len(), ALIGNMENT_VERTICES + 1);
        let start = trace[0].as_array().unwrap();
        assert!(start[0].as_f64().unwrap().abs() < 1e-6);
        assert!(start[1].as_f64().unwrap().abs() < 1e-6);

        let first = &features[1];
        assert_eq!(first["geometry"]["coordinates"], json!([[0.0, 5.0], [0.0, 0.0], [0.0, -5.0]]));
        assert_eq!(first["properties"]["id"], 1);
        assert_eq!(first["properties"]["width"], 10.0);
        assert_eq!(first["properties"]["maxDepth"], 1.5);
        assert!(features[2]["properties"]["maxDepth"].is_null());
    }

    #[test]
    fn crs_is_optional() {
        let line = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let fc = sections_feature_collection(&line, &[section(1, 0.0, None)], None).unwrap();
        assert!(fc.get("crs").is_none());
        assert!(sections_feature_collection(&line[..1], &[], None).is_err());
    }

    #[test]
    fn written_atomically_and_checked() {
        let dir = tempfile::tempdir().unwrap();
        let line = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let sections = [section(1, 0.0, None)];

        let out = dir.path().join("sections.geojson");
        let job = export_sections_geojson(&line, &sections, None, &out, &CancelToken::new()).unwrap();
        assert_eq!(job.target_kind, TargetKind::GeoJson);
        assert_eq!(job.selection.sections, vec![1]);
        let text = std::fs::read_to_string(&out).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["features"].as_array().unwrap().len(), 2);

        let err = export_sections_geojson(&line, &sections, None, &dir.path().join("s.csv"), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), hl_core::ErrorKind::UnsupportedFormat);
        let err = export_sections_geojson(&line, &[], None, &dir.path().join("e.geojson"), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), hl_core::ErrorKind::ComputationError);
    }
}
