//! Pipeline configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use hl_catalog::{DEFAULT_CACHE_CAPACITY, DEFAULT_CHUNK_ROWS};
use hl_export::{DEFAULT_NODATA, RasterPolicy};
use hl_manning::PlausibleRange;
use hl_sections::DEFAULT_INTERVALS;
use hl_series::BaseFlowPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Tunables shared by every request; every field has a default so partial
/// files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Rows per bulk read when loading result arrays.
    pub chunk_rows: usize,
    /// Sample intervals across a cross-section unless a request overrides it.
    pub section_intervals: usize,
    pub raster_policy: RasterPolicy,
    pub raster_nodata: f64,
    pub manning_range: PlausibleRange,
    pub base_flow_policy: BaseFlowPolicy,
    /// Reuse opened containers across requests until the file changes.
    pub cache_handles: bool,
    /// Most containers kept open at once.
    pub cache_capacity: usize,
    /// Default deadline for compute requests, in seconds.
    pub compute_timeout_secs: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            section_intervals: DEFAULT_INTERVALS,
            raster_policy: RasterPolicy::default(),
            raster_nodata: DEFAULT_NODATA,
            manning_range: PlausibleRange::default(),
            base_flow_policy: BaseFlowPolicy::default(),
            cache_handles: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            compute_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn load_yaml(path: &Path) -> AppResult<Self> {
        let text = read(path)?;
        let config: Self = serde_yaml::from_str(&text).map_err(|e| AppError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validated(path)
    }

    pub fn load_json(path: &Path) -> AppResult<Self> {
        let text = read(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| AppError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validated(path)
    }

    /// JSON for `.json` files, YAML otherwise.
    pub fn load(path: &Path) -> AppResult<Self> {
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json { Self::load_json(path) } else { Self::load_yaml(path) }
    }

    pub fn compute_timeout(&self) -> Option<Duration> {
        self.compute_timeout_secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64)
    }

    fn validated(self, path: &Path) -> AppResult<Self> {
        let invalid = |reason: String| AppError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        };
        if self.chunk_rows == 0 {
            return Err(invalid("chunkRows must be positive".to_string()));
        }
        if self.section_intervals == 0 {
            return Err(invalid("sectionIntervals must be positive".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(invalid("cacheCapacity must be positive".to_string()));
        }
        if self.manning_range.min >= self.manning_range.max {
            return Err(invalid(format!(
                "manningRange {}..{} is empty",
                self.manning_range.min, self.manning_range.max
            )));
        }
        if let Some(secs) = self.compute_timeout_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(invalid(format!("computeTimeoutSecs {secs} is not a duration")));
            }
        }
        Ok(self)
    }
}

fn read(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_core::ErrorKind;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        fs::write(
            &path,
            "chunkRows: 128\nrasterPolicy:\n  kind: supersample\n  factor: 4\ncomputeTimeoutSecs: 2.5\n",
        )
        .unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.chunk_rows, 128);
        assert_eq!(config.raster_policy, RasterPolicy::Supersample { factor: 4 });
        assert_eq!(config.section_intervals, DEFAULT_INTERVALS);
        assert!(config.cache_handles);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.compute_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn json_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{"cacheHandles": false, "manningRange": {"min": 0.01, "max": 0.2}}"#).unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert!(!config.cache_handles);
        assert_eq!(config.manning_range.max, 0.2);

        fs::write(&path, r#"{"chunkRows": 0}"#).unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        fs::write(&path, r#"{"cacheCapacity": 0}"#).unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn missing_file() {
        let err = PipelineConfig::load_yaml(Path::new("/no/such/pipeline.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }
}
