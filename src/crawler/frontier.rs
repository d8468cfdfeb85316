//! Crawl frontier
//!
//! This module handles:
//! - The ordered queue of URLs waiting to be fetched
//! - Ranking discovered links against sort hints
//! - Deduplicating URLs that are already queued
//!
//! Ranking is stable: records with the same rank keep their discovery order,
//! so without hints the crawl is plain breadth-first.

use crate::url::normalize_url;
use crate::UrlResult;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    /// Normalized form, used for deduplication and reporting
    pub url: Url,

    /// URL as linked, which is what gets requested
    pub target: Url,

    /// Hops from the root (the root is depth 0)
    pub depth: u32,

    /// Page the link was found on
    pub discovered_from: Option<Url>,

    /// Index of the first matching sort hint, or the number of hints
    pub rank: usize,
}

impl UrlRecord {
    /// Creates a record for `target`, failing if it cannot be normalized
    pub fn new(target: Url, depth: u32, discovered_from: Option<Url>, rank: usize) -> UrlResult<Self> {
        Ok(Self {
            url: normalize_url(target.as_str())?,
            target,
            depth,
            discovered_from,
            rank,
        })
    }

    /// Creates the record for the crawl root
    pub fn root(target: Url) -> UrlResult<Self> {
        Self::new(target, 0, None, 0)
    }
}

/// Queue of URLs to crawl, ordered by hint rank then discovery order
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<UrlRecord>,
    queued: HashSet<String>,
    hints: Vec<Regex>,
}

impl Frontier {
    /// Creates an empty frontier that ranks links against `hints`
    pub fn new(hints: Vec<Regex>) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            hints,
        }
    }

    /// Ranks a link by the first hint matching its href or anchor text
    ///
    /// Lower is better. A link matching no hint ranks after every hinted link.
    ///
    /// # Example
    ///
    /// ```
    /// use regex::RegexBuilder;
    /// use trawl::crawler::Frontier;
    ///
    /// let hint = RegexBuilder::new("contact").case_insensitive(true).build().unwrap();
    /// let frontier = Frontier::new(vec![hint]);
    /// assert_eq!(frontier.rank("/info", "Contact us"), 0);
    /// assert_eq!(frontier.rank("/news", "News"), 1);
    /// ```
    pub fn rank(&self, href: &str, text: &str) -> usize {
        self.hints
            .iter()
            .position(|hint| hint.is_match(href) || hint.is_match(text))
            .unwrap_or(self.hints.len())
    }

    /// Appends a record unless its URL is already queued
    ///
    /// Returns true if the record was added.
    pub fn push(&mut self, record: UrlRecord) -> bool {
        if !self.queued.insert(record.url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(record);
        true
    }

    /// Stably re-sorts the queue by rank
    pub fn sort_by_rank(&mut self) {
        if self.hints.is_empty() {
            return;
        }
        self.queue.make_contiguous().sort_by_key(|record| record.rank);
    }

    /// Removes and returns the head of the queue
    pub fn pop(&mut self) -> Option<UrlRecord> {
        let record = self.queue.pop_front()?;
        self.queued.remove(record.url.as_str());
        Some(record)
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.queued.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
