use crate::crawler::FetchOptions;
use crate::url::DomainScope;
use crate::TrawlError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How matches for one search key accumulate over a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Keep every occurrence on every page
    #[default]
    All,
    /// Keep only the first match found for the key
    First,
}

/// What the search patterns run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTarget {
    /// Visible text nodes of the page, one per line
    #[default]
    Text,
    /// The raw page content
    Html,
}

/// Options for a single [`Crawler::crawl`](crate::crawler::Crawler::crawl) call
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Read through and write to the page cache. Default: false.
    pub store_to_cache: bool,

    /// Patterns (case-insensitive) that pull matching links to the front of
    /// the frontier; earlier hints win. Default: none.
    pub sort_order_hints: Vec<String>,

    /// The crawl stops once every one of these keys has a match. Default: none.
    pub stop_on_keys: Vec<String>,

    /// Maximum hops from the root. Default: 2.
    pub max_depth: u32,

    /// Which hosts links may be followed into. Default: the root's host.
    pub domain_scope: DomainScope,

    /// Maximum number of pages fetched, root included. Default: 1000.
    pub max_pages: usize,

    /// Maximum pages fetched under one first path segment. Default: unlimited.
    pub max_branch_count: Option<usize>,

    /// Per-key match policies; keys not listed use [`MatchPolicy::All`]
    pub match_policies: BTreeMap<String, MatchPolicy>,

    pub match_target: MatchTarget,

    /// Extensions a link may end in; links without an extension always pass
    pub valid_extensions: Vec<String>,

    /// Maximum fetches in flight. Default: 1.
    pub concurrency: usize,

    /// Skip URLs disallowed by the site's robots.txt. Default: false.
    pub respect_robots: bool,

    pub fetch: FetchOptions,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            store_to_cache: false,
            sort_order_hints: Vec::new(),
            stop_on_keys: Vec::new(),
            max_depth: 2,
            domain_scope: DomainScope::Host,
            max_pages: 1000,
            max_branch_count: None,
            match_policies: BTreeMap::new(),
            match_target: MatchTarget::Text,
            valid_extensions: default_valid_extensions(),
            concurrency: 1,
            respect_robots: false,
            fetch: FetchOptions::default(),
        }
    }
}

/// Extensions of pages worth searching
pub fn default_valid_extensions() -> Vec<String> {
    ["html", "htm", "php", "asp", "aspx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl CrawlOptions {
    pub fn policy_for(&self, key: &str) -> MatchPolicy {
        self.match_policies.get(key).copied().unwrap_or_default()
    }

    /// Compiles the sort hints, case-insensitively
    pub fn compile_hints(&self) -> Result<Vec<Regex>, TrawlError> {
        self.sort_order_hints
            .iter()
            .map(|hint| {
                RegexBuilder::new(hint)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| TrawlError::InvalidPattern {
                        key: hint.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Fetch options as used for every page of this crawl
    pub(crate) fn page_fetch_options(&self) -> FetchOptions {
        FetchOptions {
            use_cache: self.store_to_cache,
            ..self.fetch.clone()
        }
    }
}
