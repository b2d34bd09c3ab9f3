//! Process-scoped cache of opened handles.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use hl_core::CancelToken;
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::handle::{CatalogHandle, open_cancellable};

/// Size and modification time of a file, compared on every cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileStamp {
    pub fn of(file_path: &Path) -> CatalogResult<Self> {
        let meta = fs::metadata(file_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CatalogError::FileNotFound {
                path: file_path.to_path_buf(),
            },
            _ => CatalogError::Io(e),
        })?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Handles kept by [`HandleCache::new`] before the least recently used
/// one is dropped.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

type Opener = dyn Fn(&Path, &CancelToken) -> CatalogResult<CatalogHandle> + Send + Sync;

struct CacheEntry {
    stamp: FileStamp,
    handle: CatalogHandle,
    last_used: u64,
}

#[derive(Default)]
struct Entries {
    map: HashMap<PathBuf, CacheEntry>,
    clock: u64,
}

impl Entries {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.map.len() > capacity {
            let Some(oldest) = self
                .map
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            debug!(path = %oldest.display(), "handle cache eviction");
            self.map.remove(&oldest);
        }
    }
}

/// Cache of catalog handles keyed by canonical path.
///
/// An entry is reused only while the file's [`FileStamp`] is unchanged.
/// At most `capacity` handles are kept; the least recently used goes first.
pub struct HandleCache {
    entries: Mutex<Entries>,
    capacity: usize,
    opener: Box<Opener>,
}

impl fmt::Debug for HandleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::with_opener(|p, cancel| open_cancellable(p, cancel))
    }
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom open function (alternate backends, tests).
    pub fn with_opener<F>(opener: F) -> Self
    where
        F: Fn(&Path, &CancelToken) -> CatalogResult<CatalogHandle> + Send + Sync + 'static,
    {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: DEFAULT_CACHE_CAPACITY,
            opener: Box::new(opener),
        }
    }

    /// Bound the number of cached handles (minimum one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self.lock().evict_to(self.capacity);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached handle for `file_path`, reopening when the file
    /// changed since it was cached.
    pub fn get_or_open(
        &self,
        file_path: &Path,
        cancel: &CancelToken,
    ) -> CatalogResult<CatalogHandle> {
        let stamp = FileStamp::of(file_path)?;
        let key = fs::canonicalize(file_path)?;

        {
            let mut entries = self.lock();
            let now = entries.tick();
            if let Some(entry) = entries.map.get_mut(&key) {
                if entry.stamp == stamp {
                    debug!(path = %key.display(), "handle cache hit");
                    entry.last_used = now;
                    return Ok(entry.handle.clone());
                }
                debug!(path = %key.display(), "file changed, reopening");
            }
        }

        // Opened outside the lock; a concurrent open of the same file wins
        // or loses harmlessly.
        let handle = (self.opener)(file_path, cancel)?;
        let mut entries = self.lock();
        let last_used = entries.tick();
        entries.map.insert(
            key,
            CacheEntry {
                stamp,
                handle: handle.clone(),
                last_used,
            },
        );
        entries.evict_to(self.capacity);
        Ok(handle)
    }

    /// Open through the configured opener without touching the cache.
    pub fn open_uncached(&self, file_path: &Path, cancel: &CancelToken) -> CatalogResult<CatalogHandle> {
        (self.opener)(file_path, cancel)
    }

    pub fn invalidate(&self, file_path: &Path) {
        let key = fs::canonicalize(file_path).unwrap_or_else(|_| file_path.to_path_buf());
        self.lock().map.remove(&key);
    }

    pub fn clear(&self) {
        self.lock().map.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        // A poisoned map only ever holds complete entries.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
