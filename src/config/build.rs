//! Conversion of a loaded configuration into crawl components

use crate::cache::{CacheResult, DiskCache, PageStore};
use crate::config::types::Config;
use crate::crawler::{
    default_valid_extensions, CrawlOptions, FetchOptions, Fetcher, SearchSpec,
};
use crate::TrawlError;
use std::sync::Arc;
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;

impl Config {
    /// Compiles the `[searches]` table
    pub fn search_spec(&self) -> Result<SearchSpec, TrawlError> {
        SearchSpec::from_patterns(self.searches.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            scheme_hint: self.fetch.scheme_hint,
            validate_certificate: self.fetch.validate_certificate,
            validate_reachability: self.fetch.validate_reachability,
            use_cache: self.crawl.store_to_cache,
            timeout: self.timeout(),
            redirect_scope: None,
        }
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        let crawl = &self.crawl;
        CrawlOptions {
            store_to_cache: crawl.store_to_cache,
            sort_order_hints: crawl.sort_order_hints.clone(),
            stop_on_keys: crawl.stop_on_keys.clone(),
            max_depth: crawl.max_depth,
            domain_scope: crawl.domain_scope,
            max_pages: crawl.max_pages,
            max_branch_count: crawl.max_branch_count,
            match_policies: self.match_policy.clone(),
            match_target: crawl.match_target,
            valid_extensions: crawl
                .valid_extensions
                .clone()
                .unwrap_or_else(default_valid_extensions),
            concurrency: crawl.concurrency,
            respect_robots: crawl.respect_robots,
            fetch: self.fetch_options(),
        }
    }

    /// Opens the on-disk cache named by `[cache]`
    pub fn disk_cache(&self) -> CacheResult<DiskCache> {
        let max_size = self.cache.max_size_mb.map(|mb| mb.saturating_mul(BYTES_PER_MB));
        Ok(DiskCache::new(&self.cache.directory)?.with_max_size(max_size))
    }

    /// Opens the page cache if this crawl stores to it
    pub fn open_cache(&self) -> CacheResult<Option<Arc<dyn PageStore>>> {
        if !self.crawl.store_to_cache {
            return Ok(None);
        }
        let cache: Arc<dyn PageStore> = Arc::new(self.disk_cache()?);
        Ok(Some(cache))
    }

    /// Builds a fetcher reading through the configured cache
    pub fn build_fetcher(&self) -> Result<Fetcher, TrawlError> {
        let cache = self.open_cache()?;
        Ok(Fetcher::new(&self.user_agent, self.timeout(), cache)?)
    }
}
