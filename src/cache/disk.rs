//! On-disk page cache
//!
//! ## Storage Layout
//!
//! ```text
//! <cache-dir>/
//!   example.com-3f1a...e9.json    # one entry per normalized URL
//!   example.com-9b0c...41.json
//! ```
//!
//! Entries are written to a unique temporary file in the same directory and
//! renamed over the target, so readers never observe a partial entry.

use crate::cache::{CacheEntry, CacheError, CacheKey, CacheResult, PageStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Page cache persisted as one JSON file per entry
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,

    /// Writes are skipped once the directory reaches this size.
    /// `Some(0)` makes the cache read-only.
    max_size_bytes: Option<u64>,

    /// Bytes held by entries, seeded from disk once and kept current by `put`
    used_bytes: AtomicU64,

    temp_counter: AtomicU64,
}

impl DiskCache {
    /// Opens (creating if needed) a cache rooted at `root`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use trawl::cache::{CacheEntry, CacheKey, DiskCache, PageStore};
    /// use url::Url;
    ///
    /// let cache = DiskCache::new("cache").unwrap();
    /// let url = Url::parse("https://example.com/").unwrap();
    /// cache.put(&CacheEntry::new(&url, "<html></html>")).unwrap();
    /// assert!(cache.get(&CacheKey::for_url(&url)).is_some());
    /// ```
    pub fn new(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let used_bytes = AtomicU64::new(scan_size(&root));
        Ok(Self {
            root,
            max_size_bytes: None,
            used_bytes,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Limits the size of the cache directory
    pub fn with_max_size(mut self, max_size_bytes: Option<u64>) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{}", key.as_str(), ENTRY_EXTENSION))
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".{}.{}.{}.{}",
            key.as_str(),
            std::process::id(),
            n,
            TEMP_EXTENSION
        ))
    }

    /// Total size in bytes of the entries written through this handle
    /// plus those present when it was opened
    pub fn size_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .filter(|e| is_entry_file(&e.path()))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_allowed(&self) -> bool {
        match self.max_size_bytes {
            None => true,
            Some(0) => false,
            Some(max) => self.size_bytes() < max,
        }
    }
}

impl PageStore for DiskCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!("Unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.cache_key == key.as_str() => {
                tracing::trace!("Cache hit {} ({})", key, entry.url);
                Some(entry)
            }
            Ok(entry) => {
                tracing::debug!(
                    "Cache entry {} holds key {}, treating as miss",
                    path.display(),
                    entry.cache_key
                );
                None
            }
            Err(e) => {
                tracing::debug!("Corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, entry: &CacheEntry) -> CacheResult<()> {
        if !self.write_allowed() {
            tracing::debug!(
                "Cache directory {} is at its size limit, not storing {}",
                self.root.display(),
                entry.url
            );
            return Ok(());
        }

        fs::create_dir_all(&self.root)?;

        let key = entry.key();
        let json = serde_json::to_vec(entry)?;
        let tmp_path = self.temp_path(&key);
        let path = self.entry_path(&key);

        let new_len = json.len() as u64;
        let old_len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        fs::write(&tmp_path, json)?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            let _ = fs::remove_file(&path);
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::Io(e));
        }

        self.used_bytes.fetch_add(new_len, Ordering::Relaxed);
        // saturating: a concurrent clear may already have reset the counter
        let _ = self
            .used_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(old_len))
            });

        tracing::debug!("Cached {} as {}", entry.url, path.display());
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.root)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0usize;
        for dir_entry in dir {
            let path = dir_entry?.path();
            let is_temp = path.extension().is_some_and(|ext| ext == TEMP_EXTENSION);
            if is_entry_file(&path) || is_temp {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        self.used_bytes.store(0, Ordering::Relaxed);
        tracing::info!("Cleared {} cache files from {}", removed, self.root.display());
        Ok(())
    }
}

fn scan_size(root: &Path) -> u64 {
    let Ok(dir) = fs::read_dir(root) else {
        return 0;
    };

    dir.filter_map(|e| e.ok())
        .filter(|e| is_entry_file(&e.path()))
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn is_entry_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}
