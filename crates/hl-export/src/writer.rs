//! Exclusive, all-or-nothing output files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use hl_core::CancelToken;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};

/// A lock file untouched for this long is left over from a crashed writer.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(15 * 60);

/// Marks `<output>.lock` for the lifetime of a write. Creation fails when
/// another writer holds it; the file is removed on drop.
///
/// The lock records the writer's pid and start time. A lock older than
/// [`STALE_LOCK_AGE`], or whose pid is known to be gone, is taken over.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    pub fn lock_path(output: &Path) -> PathBuf {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        output.with_file_name(name)
    }

    pub fn acquire(output: &Path) -> ExportResult<Self> {
        Self::acquire_with(output, STALE_LOCK_AGE)
    }

    pub fn acquire_with(output: &Path, stale_after: Duration) -> ExportResult<Self> {
        let path = Self::lock_path(output);
        let result = match Self::create(&path) {
            Err(ExportError::Collision { .. }) if is_stale(&path, stale_after) => {
                warn!(path = %path.display(), "removing stale output lock");
                fs::remove_file(&path).map_err(ExportError::io(&path))?;
                Self::create(&path)
            }
            other => other,
        };
        result.map_err(|e| match e {
            ExportError::Collision { .. } => ExportError::Collision {
                path: output.to_path_buf(),
            },
            e => e,
        })
    }

    fn create(path: &Path) -> ExportResult<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ExportError::Collision {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(ExportError::io(path)(e)),
        };
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(
            file,
            "{} {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        )
        .map_err(ExportError::io(path))?;
        Ok(lock)
    }
}

fn is_stale(lock: &Path, stale_after: Duration) -> bool {
    let age = fs::metadata(lock)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| SystemTime::now().duration_since(t).ok());
    if age.is_some_and(|age| age >= stale_after) {
        return true;
    }
    fs::read_to_string(lock)
        .ok()
        .and_then(|text| text.split_whitespace().next()?.parse::<u32>().ok())
        .is_some_and(|pid| !process_alive(pid))
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "lock file not removed");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub bytes: u64,
    pub sha256: String,
}

/// Hidden sibling of `output` that keeps its extension.
fn temp_sibling(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.{}.tmp.{}", Uuid::new_v4().simple(), ext.to_string_lossy()),
        None => format!(".{stem}.{}.tmp", Uuid::new_v4().simple()),
    };
    output.with_file_name(name)
}

pub fn file_digest(path: &Path) -> ExportResult<WriteReport> {
    let mut file = File::open(path).map_err(ExportError::io(path))?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher).map_err(ExportError::io(path))?;
    Ok(WriteReport {
        bytes,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// Write `output` through `body`, which receives a temporary path to fill.
///
/// The temporary file replaces `output` only when `body` succeeds and the
/// token is still live; otherwise it is removed and `output` is untouched.
pub fn write_atomic(
    output: &Path,
    cancel: &CancelToken,
    body: impl FnOnce(&Path) -> ExportResult<()>,
) -> ExportResult<WriteReport> {
    cancel.check()?;
    if output.is_dir() {
        return Err(ExportError::InvalidRequest(format!(
            "output {} is a directory",
            output.display()
        )));
    }
    let _lock = OutputLock::acquire(output)?;
    let tmp = temp_sibling(output);

    let result = body(&tmp)
        .and_then(|()| cancel.check().map_err(ExportError::from))
        .and_then(|()| file_digest(&tmp))
        .and_then(|report| {
            fs::rename(&tmp, output).map_err(ExportError::io(output))?;
            Ok(report)
        });
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            debug!(path = %tmp.display(), error = %e, "temporary output not removed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_core::ErrorKind;

    #[test]
    fn lock_blocks_second_writer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("grid.asc");
        let held = OutputLock::acquire(&out).unwrap();
        let err = write_atomic(&out, &CancelToken::new(), |p| {
            fs::write(p, "x").map_err(ExportError::io(p))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExportIoError);
        assert!(!out.exists());
        drop(held);
        assert!(!OutputLock::lock_path(&out).exists());
    }

    #[test]
    fn lock_records_writer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("grid.asc");
        let _held = OutputLock::acquire(&out).unwrap();
        let text = fs::read_to_string(OutputLock::lock_path(&out)).unwrap();
        let pid: u32 = text.split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(pid, std::process::id());
    }

    #[test]
    fn old_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("grid.asc");
        let lock = OutputLock::lock_path(&out);
        fs::write(&lock, format!("{} 2020-01-01T00:00:00Z\n", std::process::id())).unwrap();
        File::options()
            .write(true)
            .open(&lock)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        assert!(OutputLock::acquire_with(&out, Duration::from_secs(7200)).is_err());
        write_atomic(&out, &CancelToken::new(), |p| {
            fs::write(p, "x").map_err(ExportError::io(p))
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "x");
        assert!(!lock.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn lock_of_dead_process_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("t.csv");
        fs::write(OutputLock::lock_path(&out), "4294967294 2026-01-01T00:00:00Z\n").unwrap();
        assert!(OutputLock::acquire(&out).is_ok());
    }

    #[test]
    fn failed_body_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("t.csv");
        let err = write_atomic(&out, &CancelToken::new(), |p| {
            fs::write(p, "partial").map_err(ExportError::io(p))?;
            Err(ExportError::InvalidRequest("boom".into()))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComputationError);
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn digest_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("t.json");
        let report = write_atomic(&out, &CancelToken::new(), |p| {
            fs::write(p, "abc").map_err(ExportError::io(p))
        })
        .unwrap();
        assert_eq!(report.bytes, 3);
        assert_eq!(
            report.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "abc");
    }
}
