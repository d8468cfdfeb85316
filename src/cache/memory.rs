use crate::cache::{CacheEntry, CacheKey, CacheResult, PageStore};
use std::collections::HashMap;
use std::sync::RwLock;

/// Page cache that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        // a poisoned lock only means a writer panicked; entries are still whole
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(key.as_str()).cloned()
    }

    fn put(&self, entry: &CacheEntry) -> CacheResult<()> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(entry.cache_key.clone(), entry.clone());
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
        Ok(())
    }
}
