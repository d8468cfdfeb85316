use crate::url::Scheme;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A page that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// Outcome of a crawl
///
/// Matches for each search key are listed in discovery order. Every search
/// key is present, with an empty list when nothing was found.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub(crate) root: String,
    pub(crate) resolved_root: String,
    pub(crate) scheme: Scheme,
    pub(crate) matches: BTreeMap<String, Vec<String>>,
    pub(crate) found_on: BTreeMap<String, Vec<String>>,
    pub(crate) visited_urls: Vec<String>,
    pub(crate) failed_urls: Vec<FailedUrl>,
    pub(crate) external_hosts: BTreeSet<String>,
    pub(crate) stopped_early: bool,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// The root as passed to the crawler
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The root's final URL after scheme resolution and redirects
    pub fn resolved_root(&self) -> &str {
        &self.resolved_root
    }

    /// Scheme resolved for the root
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn matches(&self) -> &BTreeMap<String, Vec<String>> {
        &self.matches
    }

    /// Matches for one key, empty for unknown keys
    pub fn matches_for(&self, key: &str) -> &[String] {
        self.matches.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// For every match, the URL of the page it was found on
    ///
    /// Parallel to [`matches`](Self::matches): `found_on()[key][i]` is where
    /// `matches()[key][i]` came from.
    pub fn found_on(&self) -> &BTreeMap<String, Vec<String>> {
        &self.found_on
    }

    /// True if at least one match was found for `key`
    pub fn is_found(&self, key: &str) -> bool {
        !self.matches_for(key).is_empty()
    }

    /// Normalized URLs successfully fetched, in completion order
    pub fn visited_urls(&self) -> &[String] {
        &self.visited_urls
    }

    pub fn failed_urls(&self) -> &[FailedUrl] {
        &self.failed_urls
    }

    /// Hosts linked to from crawled pages that lie outside the crawl scope
    pub fn external_hosts(&self) -> &BTreeSet<String> {
        &self.external_hosts
    }

    /// True if the crawl ended because every stop key was satisfied
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Total number of matches across all keys
    pub fn match_count(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }
}

impl fmt::Display for CrawlResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matches in {}", self.resolved_root)?;
        for (key, matches) in &self.matches {
            write!(f, "\n{} : {:?}", key, matches)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample() -> CrawlResult {
    let now = Utc::now();
    CrawlResult {
        root: "www.example.com".into(),
        resolved_root: "https://www.example.com/".into(),
        scheme: Scheme::Https,
        matches: BTreeMap::from([
            ("longwords".to_string(), vec!["established".to_string()]),
            ("postcode".to_string(), Vec::new()),
        ]),
        found_on: BTreeMap::from([
            (
                "longwords".to_string(),
                vec!["https://www.example.com/".to_string()],
            ),
            ("postcode".to_string(), Vec::new()),
        ]),
        visited_urls: vec!["https://www.example.com/".into()],
        failed_urls: Vec::new(),
        external_hosts: BTreeSet::new(),
        stopped_early: false,
        started_at: now,
        finished_at: now,
    }
}
