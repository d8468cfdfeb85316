//! Page cache for fetched content
//!
//! This module memoizes raw page content keyed by normalized URL, so that
//! repeated crawls avoid network cost. It provides:
//! - [`CacheKey`] derivation from a URL
//! - The [`PageStore`] trait implemented by every cache backend
//! - [`DiskCache`], one JSON file per entry with atomic replace
//! - [`MemoryCache`], a process-lifetime cache
//!
//! A missing, unreadable or corrupt entry is always a cache miss.

mod disk;
mod key;
mod memory;

pub use disk::DiskCache;
pub use key::CacheKey;
pub use memory::MemoryCache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors that can occur while writing to or clearing a cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A single memoized page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key derived from `url`
    pub cache_key: String,

    /// The normalized URL that was requested
    pub url: String,

    /// Final URL after redirects
    pub resolved_url: String,

    /// Page body exactly as fetched
    pub content: String,

    /// When the page was fetched from the network
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry for content fetched from `url` just now
    pub fn new(url: &Url, content: impl Into<String>) -> Self {
        let key = CacheKey::for_url(url);
        Self {
            cache_key: key.as_str().to_string(),
            url: key.url().to_string(),
            resolved_url: key.url().to_string(),
            content: content.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Records where the request ended up after redirects
    pub fn with_resolved_url(mut self, resolved: &Url) -> Self {
        self.resolved_url = resolved.to_string();
        self
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::from_raw(&self.cache_key, &self.url)
    }
}

/// Trait for page cache backends
///
/// Implementations must be safe for concurrent readers and for writers on
/// different keys. Concurrent writers to the same key may race; the last
/// writer wins.
pub trait PageStore: Send + Sync {
    /// Looks up an entry. Corrupt or unreadable entries are reported as `None`.
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Stores an entry, replacing any previous entry for the same key
    fn put(&self, entry: &CacheEntry) -> CacheResult<()>;

    /// Removes every entry
    fn clear(&self) -> CacheResult<()>;
}
