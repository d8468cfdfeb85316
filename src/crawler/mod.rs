//! Crawler module for web page fetching and searching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through the page cache, with scheme resolution
//! - HTML parsing and link extraction
//! - Pattern extraction with named searches
//! - The hint-ordered frontier
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod options;
mod parser;
mod result;

pub use coordinator::{CrawlPhase, Crawler};
pub use extractor::{extract, SearchSpec};
pub use fetcher::{
    build_http_client, http_client_builder, FetchError, FetchOptions, FetchedPage, Fetcher,
    RedirectScope, DEFAULT_TIMEOUT,
};
pub use frontier::{Frontier, UrlRecord};
pub use options::{default_valid_extensions, CrawlOptions, MatchPolicy, MatchTarget};
pub use parser::{has_allowed_extension, parse_html, PageLink, ParsedPage};
pub use result::{CrawlResult, FailedUrl};

pub use crate::url::{DomainScope, Scheme};

#[cfg(test)]
pub(crate) use result::sample as sample_result;
