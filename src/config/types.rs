use crate::crawler::{MatchPolicy, MatchTarget, DEFAULT_TIMEOUT};
use crate::url::{DomainScope, Scheme};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    /// Search key to regular expression
    #[serde(default)]
    pub searches: BTreeMap<String, String>,

    /// Search key to match policy; unlisted keys keep every match
    #[serde(rename = "match-policy", default)]
    pub match_policy: BTreeMap<String, MatchPolicy>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Site to crawl, with or without scheme
    pub root: String,

    /// Maximum hops from the root
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched, root included
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum pages fetched under one first path segment
    #[serde(rename = "max-branch-count")]
    pub max_branch_count: Option<usize>,

    #[serde(rename = "sort-order-hints", default)]
    pub sort_order_hints: Vec<String>,

    #[serde(rename = "stop-on-keys", default)]
    pub stop_on_keys: Vec<String>,

    #[serde(rename = "domain-scope", default)]
    pub domain_scope: DomainScope,

    /// Maximum number of concurrent page fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(rename = "match-target", default)]
    pub match_target: MatchTarget,

    #[serde(rename = "store-to-cache", default)]
    pub store_to_cache: bool,

    #[serde(rename = "respect-robots", default)]
    pub respect_robots: bool,

    /// Overrides the default list of followed file extensions
    #[serde(rename = "valid-extensions")]
    pub valid_extensions: Option<Vec<String>>,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Scheme assumed for the root when it has none, instead of probing
    #[serde(rename = "scheme-hint")]
    pub scheme_hint: Option<Scheme>,

    #[serde(rename = "validate-certificate", default = "default_true")]
    pub validate_certificate: bool,

    #[serde(rename = "validate-reachability", default = "default_true")]
    pub validate_reachability: bool,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scheme_hint: None,
            validate_certificate: true,
            validate_reachability: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one file per cached page
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Size limit of the cache directory in megabytes; 0 makes it read-only
    #[serde(rename = "max-size-mb")]
    pub max_size_mb: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            max_size_mb: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header, e.g. `trawl/0.1.0 (+https://example.com; admin@example.com)`
    pub fn user_agent_string(&self) -> String {
        let mut contact = Vec::new();
        if let Some(url) = &self.contact_url {
            contact.push(format!("+{}", url));
        }
        if let Some(email) = &self.contact_email {
            contact.push(email.clone());
        }

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> usize {
    1000
}

fn default_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("cache")
}

fn default_crawler_name() -> String {
    "trawl".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
