use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};
use crate::writer::WriteReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    MeshFieldExport,
    Raster,
    Tabular,
    #[serde(rename = "geojson")]
    GeoJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// What an export covers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSelection {
    pub variables: Vec<String>,
    pub time_steps: Vec<usize>,
    pub sections: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: Uuid,
    pub target_kind: TargetKind,
    pub selection: ExportSelection,
    pub output_path: PathBuf,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub bytes_written: u64,
    /// Hex SHA-256 of the written output.
    pub sha256: Option<String>,
    /// Mesh cells that no raster pixel sampled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unassigned_cells: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportJob {
    pub fn new(target_kind: TargetKind, selection: ExportSelection, output_path: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_kind,
            selection,
            output_path: output_path.to_path_buf(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            finished_at: None,
            bytes_written: 0,
            sha256: None,
            unassigned_cells: None,
            error: None,
        }
    }

    /// Run `work` and record its outcome. Failures are logged with the job
    /// id and returned.
    pub(crate) fn run(
        mut self,
        work: impl FnOnce(&mut Self) -> ExportResult<WriteReport>,
    ) -> ExportResult<Self> {
        self.status = JobStatus::Running;
        match work(&mut self) {
            Ok(report) => {
                self.status = JobStatus::Done;
                self.finished_at = Some(Utc::now());
                self.bytes_written = report.bytes;
                self.sha256 = Some(report.sha256);
                info!(
                    job = %self.id,
                    kind = ?self.target_kind,
                    path = %self.output_path.display(),
                    bytes = self.bytes_written,
                    "export done"
                );
                Ok(self)
            }
            Err(e) => {
                self.fail(&e);
                warn!(job = %self.id, kind = ?self.target_kind, status = ?self.status, error = %e, "export failed");
                Err(e)
            }
        }
    }

    fn fail(&mut self, error: &ExportError) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.to_string());
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialization() {
        let job = ExportJob::new(TargetKind::MeshFieldExport, ExportSelection::default(), Path::new("a.vtu"));
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["targetKind"], "mesh-field-export");
        assert_eq!(v["status"], "pending");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn failed_run_returns_error() {
        let job = ExportJob::new(TargetKind::Tabular, ExportSelection::default(), Path::new("x.csv"));
        let err = job
            .run(|_| Err(ExportError::InvalidRequest("nothing to write".into())))
            .unwrap_err();
        assert_eq!(err.kind(), hl_core::ErrorKind::ComputationError);
    }
}
