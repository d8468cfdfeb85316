//! Trawl: a pattern-searching site crawler with a durable page cache
//!
//! This crate fetches pages of a single site, runs a set of named regular
//! expressions against each page and collects the matches. Fetched pages are
//! memoized in a page cache so repeated runs avoid network cost.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid pattern for '{key}': {source}")]
    InvalidPattern { key: String, source: regex::Error },

    #[error("No scheme could be resolved for {url}")]
    SchemeResolution { url: String },

    #[error("Root {url} is unreachable: {source}")]
    RootUnreachable {
        url: String,
        source: crawler::FetchError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheKey, DiskCache, MemoryCache, PageStore};
pub use config::Config;
pub use crawler::{
    CrawlOptions, CrawlResult, Crawler, DomainScope, FetchOptions, Fetcher, MatchPolicy,
    MatchTarget, Scheme, SearchSpec,
};
pub use self::url::{extract_domain, normalize_url};
