//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Fetching the root and resolving its scheme and scope
//! - Managing the frontier and the visited set
//! - Running searches on each page and merging matches
//! - Following in-scope links in hint order
//! - Evaluating the stop condition after every page
//!
//! The coordinator is the only owner of crawl state. Fetches may run
//! concurrently, but each one hands its page back to the coordinator, which
//! marks URLs visited at dispatch and merges results one page at a time.

use crate::crawler::extractor::extract;
use crate::crawler::frontier::{Frontier, UrlRecord};
use crate::crawler::parser::{has_allowed_extension, parse_html};
use crate::crawler::{
    CrawlOptions, CrawlResult, FailedUrl, FetchError, FetchOptions, FetchedPage, Fetcher,
    MatchPolicy, MatchTarget, RedirectScope, SearchSpec,
};
use crate::robots::{fetch_robots, RobotsRules};
use crate::url::{extract_domain, first_path_segment, normalize_url};
use crate::{TrawlError, UrlError};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

/// Where a crawl currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Fetching(String),
    Extracting(String),
    FrontierUpdate,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching(url) => write!(f, "fetching {}", url),
            Self::Extracting(url) => write!(f, "extracting {}", url),
            Self::FrontierUpdate => write!(f, "updating frontier"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Crawls a site and searches every page it fetches
///
/// # Example
///
/// ```no_run
/// use trawl::config::UserAgentConfig;
/// use trawl::crawler::{CrawlOptions, Crawler, Fetcher, SearchSpec, DEFAULT_TIMEOUT};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Fetcher::new(&UserAgentConfig::default(), DEFAULT_TIMEOUT, None)?;
/// let crawler = Crawler::new(fetcher);
/// let spec = SearchSpec::from_patterns([("postcode", r"\d{4}\s?[A-Z]{2}")])?;
/// let result = crawler.crawl("www.example.com", &spec, &CrawlOptions::default()).await?;
/// println!("{}", result);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Crawler {
    fetcher: Fetcher,
}

impl Crawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Crawls the site at `root`, searching every fetched page with `specs`
    ///
    /// `root` may omit its scheme. The root is fetched first; the scheme it
    /// resolves to is reused for every later fetch, and its final host (after
    /// redirects) bounds the crawl. Later pages that redirect outside that
    /// scope are recorded as failed and never fetched from the other host.
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | A sort hint does not compile | `InvalidPattern` |
    /// | No scheme reachable for the root | `SchemeResolution` |
    /// | Any other root failure | `RootUnreachable` |
    ///
    /// Failures on any other page are recorded in the result and the crawl
    /// continues.
    pub async fn crawl(
        &self,
        root: &str,
        specs: &SearchSpec,
        options: &CrawlOptions,
    ) -> Result<CrawlResult, TrawlError> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut state = CrawlState::new(specs, options)?;

        for key in &state.stop_keys {
            if !specs.contains_key(key) {
                tracing::warn!("Stop key '{}' has no search pattern and can never be satisfied", key);
            }
        }

        tracing::info!("Starting crawl of {}", root);

        state.set_phase(CrawlPhase::Fetching(root.to_string()));
        let root_page = self
            .fetcher
            .fetch(root, &options.page_fetch_options())
            .await
            .map_err(|e| match e {
                FetchError::SchemeResolution { url } => TrawlError::SchemeResolution { url },
                source => TrawlError::RootUnreachable {
                    url: root.to_string(),
                    source,
                },
            })?;

        let scheme = root_page.scheme;
        let root_host = extract_domain(&root_page.resolved_url).ok_or(UrlError::MissingDomain)?;
        let resolved_root = root_page.resolved_url.to_string();
        let fetch_options = follow_up_options(options, &root_page, &root_host);

        if !root_page.certificate_valid && options.fetch.validate_certificate {
            tracing::warn!(
                "Certificate of {} is not valid, crawling without certificate validation",
                resolved_root
            );
        }

        tracing::info!(
            "Resolved {} to {} (scope: {:?} of {})",
            root,
            resolved_root,
            options.domain_scope,
            root_host
        );

        let robots = if options.respect_robots {
            Some(fetch_robots(&self.fetcher, &root_page.resolved_url, &fetch_options).await)
        } else {
            None
        };
        let agent_token = self
            .fetcher
            .user_agent()
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let root_record = UrlRecord::root(root_page.requested_url.clone())?;
        state.mark_visited(&root_record.url);
        state.dispatched = 1;
        state.handle_page(root_record, root_page, &root_host);

        let mut tasks = JoinSet::new();
        loop {
            while !state.stopped && tasks.len() < options.concurrency.max(1) {
                if state.dispatched >= options.max_pages {
                    break;
                }
                let Some(record) = state.next_record(robots.as_ref(), &agent_token) else {
                    break;
                };

                state.mark_visited(&record.url);
                state.dispatched += 1;
                state.set_phase(CrawlPhase::Fetching(record.url.to_string()));

                let fetcher = self.fetcher.clone();
                let fetch_options = fetch_options.clone();
                tasks.spawn(async move {
                    let result = fetcher.fetch_url(&record.target, &fetch_options).await;
                    (record, result)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined {
                Ok((record, Ok(page))) => state.handle_page(record, page, &root_host),
                Ok((record, Err(e))) => state.handle_failure(record, e),
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }

            let completed = state.visited_urls.len() + state.failed_urls.len();
            if completed % 10 == 0 {
                let rate = completed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    completed,
                    state.frontier.len(),
                    rate
                );
            }
        }

        state.set_phase(CrawlPhase::Done);

        if state.stopped {
            tracing::info!("All stop keys satisfied, stopping crawl");
        } else if state.dispatched >= options.max_pages && !state.frontier.is_empty() {
            tracing::info!("Reached the limit of {} pages", options.max_pages);
        }

        tracing::info!(
            "Crawl completed: {} pages crawled, {} failed, {} matches in {:?}",
            state.visited_urls.len(),
            state.failed_urls.len(),
            state.matches.values().map(Vec::len).sum::<usize>(),
            start_time.elapsed()
        );

        Ok(CrawlResult {
            root: root.to_string(),
            resolved_root,
            scheme,
            matches: state.matches,
            found_on: state.found_on,
            visited_urls: state.visited_urls,
            failed_urls: state.failed_urls,
            external_hosts: state.external_hosts,
            stopped_early: state.stopped,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Fetch options for every page after the root
///
/// The root's scheme becomes the hint, redirects are confined to the crawl
/// scope, and a root that only answered without certificate validation
/// keeps it off for the rest of the crawl.
fn follow_up_options(options: &CrawlOptions, root: &FetchedPage, root_host: &str) -> FetchOptions {
    let mut fetch = options.page_fetch_options();
    fetch.scheme_hint = Some(root.scheme);
    fetch.redirect_scope = Some(RedirectScope::new(root_host, options.domain_scope));
    if !root.certificate_valid {
        fetch.validate_certificate = false;
    }
    fetch
}

/// Mutable state of one crawl
struct CrawlState<'a> {
    specs: &'a SearchSpec,
    options: &'a CrawlOptions,
    stop_keys: BTreeSet<String>,

    phase: CrawlPhase,
    frontier: Frontier,
    visited: HashSet<String>,
    branch_counts: HashMap<String, usize>,
    dispatched: usize,

    matches: BTreeMap<String, Vec<String>>,
    found_on: BTreeMap<String, Vec<String>>,
    satisfied: BTreeSet<String>,
    stopped: bool,

    visited_urls: Vec<String>,
    failed_urls: Vec<FailedUrl>,
    external_hosts: BTreeSet<String>,
}

impl<'a> CrawlState<'a> {
    fn new(specs: &'a SearchSpec, options: &'a CrawlOptions) -> Result<Self, TrawlError> {
        let hints = options.compile_hints()?;
        let matches: BTreeMap<String, Vec<String>> =
            specs.keys().map(|k| (k.to_string(), Vec::new())).collect();

        Ok(Self {
            specs,
            options,
            stop_keys: options.stop_on_keys.iter().cloned().collect(),
            phase: CrawlPhase::Idle,
            frontier: Frontier::new(hints),
            visited: HashSet::new(),
            branch_counts: HashMap::new(),
            dispatched: 0,
            found_on: matches.clone(),
            matches,
            satisfied: BTreeSet::new(),
            stopped: false,
            visited_urls: Vec::new(),
            failed_urls: Vec::new(),
            external_hosts: BTreeSet::new(),
        })
    }

    fn set_phase(&mut self, phase: CrawlPhase) {
        tracing::debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn mark_visited(&mut self, url: &Url) {
        self.visited.insert(url.as_str().to_string());
    }

    fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Pops the next record worth fetching
    fn next_record(&mut self, robots: Option<&RobotsRules>, agent: &str) -> Option<UrlRecord> {
        while let Some(record) = self.frontier.pop() {
            if self.is_visited(&record.url) {
                continue;
            }

            if let Some(robots) = robots {
                if !robots.is_allowed(record.target.as_str(), agent) {
                    tracing::info!("URL {} disallowed by robots.txt", record.target);
                    continue;
                }
            }

            if let Some(limit) = self.options.max_branch_count {
                if let Some(branch) = first_path_segment(&record.url) {
                    let count = self.branch_counts.entry(branch).or_insert(0);
                    if *count >= limit {
                        tracing::debug!("Branch limit reached, skipping {}", record.url);
                        continue;
                    }
                    *count += 1;
                }
            }

            return Some(record);
        }
        None
    }

    /// Records a page that could not be fetched
    fn handle_failure(&mut self, record: UrlRecord, error: FetchError) {
        tracing::warn!("Failed to fetch {}: {}", record.target, error);
        if let FetchError::OutOfScopeRedirect { location, .. } = &error {
            if let Some(host) = extract_domain(location) {
                self.external_hosts.insert(host);
            }
        }
        self.failed_urls.push(FailedUrl {
            url: record.target.to_string(),
            reason: error.to_string(),
        });
    }

    /// Merges a fetched page into the crawl
    fn handle_page(&mut self, record: UrlRecord, page: FetchedPage, root_host: &str) {
        self.set_phase(CrawlPhase::Extracting(record.target.to_string()));

        if let Ok(resolved) = normalize_url(page.resolved_url.as_str()) {
            self.mark_visited(&resolved);
        }
        self.visited_urls.push(record.url.to_string());

        let parsed = parse_html(&page.content, &page.resolved_url);
        let target = match self.options.match_target {
            MatchTarget::Text => parsed.text.as_str(),
            MatchTarget::Html => page.content.as_str(),
        };

        let found = extract(target, self.specs);
        self.merge_matches(found, &record.url);

        if !self.stop_keys.is_empty() && self.stop_keys.is_subset(&self.satisfied) {
            self.stopped = true;
            return;
        }

        self.set_phase(CrawlPhase::FrontierUpdate);
        if record.depth >= self.options.max_depth {
            return;
        }

        let mut added = 0usize;
        for link in &parsed.links {
            let rank = self.frontier.rank(&link.href, &link.text);
            let candidate = Url::parse(&link.url)
                .map_err(|e| UrlError::Parse(e.to_string()))
                .and_then(|target| {
                    UrlRecord::new(target, record.depth + 1, Some(record.url.clone()), rank)
                });
            let candidate = match candidate {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link.url, e);
                    continue;
                }
            };
            let url = &candidate.url;

            let Some(host) = extract_domain(url) else {
                continue;
            };
            if !self.options.domain_scope.contains(root_host, &host) {
                self.external_hosts.insert(host);
                continue;
            }

            if !has_allowed_extension(url, &self.options.valid_extensions) {
                tracing::debug!("Skipping {} (extension)", url);
                continue;
            }

            if self.is_visited(url) || self.frontier.contains(url) {
                continue;
            }

            if self.frontier.push(candidate) {
                added += 1;
            }
        }

        if added > 0 {
            self.frontier.sort_by_rank();
        }
        tracing::debug!(
            "{} new links from {}, {} in frontier",
            added,
            record.url,
            self.frontier.len()
        );
    }

    fn merge_matches(&mut self, found: BTreeMap<String, Vec<String>>, url: &Url) {
        for (key, mut new_matches) in found {
            if new_matches.is_empty() {
                continue;
            }

            let existing = self.matches.entry(key.clone()).or_default();
            match self.options.policy_for(&key) {
                MatchPolicy::All => {}
                MatchPolicy::First if existing.is_empty() => new_matches.truncate(1),
                MatchPolicy::First => continue,
            }

            if existing.is_empty() {
                tracing::info!("Found a match for {} at {}", key, url);
            }

            let origins = self.found_on.entry(key.clone()).or_default();
            origins.extend(std::iter::repeat(url.to_string()).take(new_matches.len()));
            existing.extend(new_matches);

            if self.stop_keys.contains(&key) {
                self.satisfied.insert(key);
            }
        }
    }
}
