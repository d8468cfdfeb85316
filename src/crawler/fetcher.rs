//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Resolving the scheme of scheme-less URLs (probing https before http,
//!   with and without certificate validation)
//! - Reading through and writing to the page cache
//! - GET requests to fetch page content
//! - Following redirects by hand, within an optional host scope
//! - Error classification
//!
//! The fetcher never retries. A failed request is reported to the caller,
//! which decides what to do with it.

use crate::cache::{CacheEntry, CacheKey, PageStore};
use crate::config::UserAgentConfig;
use crate::url::{extract_domain, normalize_url, split_scheme, with_scheme, DomainScope, Scheme};
use crate::UrlError;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, ClientBuilder, Response};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Options recognized by [`Fetcher::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Scheme to assume for scheme-less URLs instead of probing. Default: none.
    pub scheme_hint: Option<Scheme>,

    /// When false, TLS certificate errors are ignored. Default: true.
    pub validate_certificate: bool,

    /// When true and neither the URL nor the hint carries a scheme, candidate
    /// schemes are probed before the real request. Default: true.
    pub validate_reachability: bool,

    /// Read through and write to the page cache. Default: true.
    pub use_cache: bool,

    /// Per-request timeout. Default: 5 seconds.
    pub timeout: Duration,

    /// Hosts redirects may lead to. Default: none, any host is followed.
    pub redirect_scope: Option<RedirectScope>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            scheme_hint: None,
            validate_certificate: true,
            validate_reachability: true,
            use_cache: true,
            timeout: DEFAULT_TIMEOUT,
            redirect_scope: None,
        }
    }
}

/// The hosts a crawl is confined to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectScope {
    pub root_host: String,
    pub scope: DomainScope,
}

impl RedirectScope {
    pub fn new(root_host: impl Into<String>, scope: DomainScope) -> Self {
        Self {
            root_host: root_host.into(),
            scope,
        }
    }

    /// Returns true if `url` lives on a host inside the scope
    pub fn allows(&self, url: &Url) -> bool {
        extract_domain(url).is_some_and(|host| self.scope.contains(&self.root_host, &host))
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Page body
    pub content: String,

    /// URL that was requested, before redirects
    pub requested_url: Url,

    /// Final URL after redirects
    pub resolved_url: Url,

    /// Scheme actually used; reusable as a hint for later fetches
    pub scheme: Scheme,

    /// HTTP status code (200 for cache hits)
    pub status: u16,

    /// True if no network request was made
    pub from_cache: bool,

    /// False if the page was fetched without certificate validation, either
    /// because it was disabled or because https only answered without it
    pub certificate_valid: bool,
}

/// Ways a single fetch can fail
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No candidate scheme reachable for {url}")]
    SchemeResolution { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("{url} is not a text page (content-type {content_type})")]
    UnsupportedContent { url: String, content_type: String },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl { url: String, source: UrlError },

    #[error("{url} redirects to {location}, outside the crawl scope")]
    OutOfScopeRedirect { url: String, location: Url },

    #[error("More than {max} redirects for {url}", max = MAX_REDIRECTS)]
    TooManyRedirects { url: String },

    #[error("Redirect loop at {url}")]
    RedirectLoop { url: String },
}

/// Client builder preconfigured for the fetcher
///
/// Redirects are disabled on the client: [`Fetcher`] follows them itself so
/// that every hop can be checked against the crawl scope. Callers may add
/// their own settings (proxies, DNS overrides) before building and hand
/// the result to [`Fetcher::from_clients`].
pub fn http_client_builder(
    config: &UserAgentConfig,
    timeout: Duration,
    accept_invalid_certs: bool,
) -> ClientBuilder {
    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use trawl::config::UserAgentConfig;
/// use trawl::crawler::{build_http_client, DEFAULT_TIMEOUT};
///
/// let client = build_http_client(&UserAgentConfig::default(), DEFAULT_TIMEOUT, false).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    http_client_builder(config, timeout, accept_invalid_certs).build()
}

/// Fetches pages over HTTP(S), optionally through a page cache
///
/// Cloning is cheap: clients and the cache are shared.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    insecure_client: Client,
    cache: Option<Arc<dyn PageStore>>,
    user_agent: String,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The user agent configuration
    /// * `timeout` - Per-request timeout
    /// * `cache` - Page cache to read through, if any
    pub fn new(
        config: &UserAgentConfig,
        timeout: Duration,
        cache: Option<Arc<dyn PageStore>>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::from_clients(
            build_http_client(config, timeout, false)?,
            build_http_client(config, timeout, true)?,
            config.user_agent_string(),
            cache,
        ))
    }

    /// Creates a fetcher from prebuilt clients
    ///
    /// `insecure_client` is used whenever certificates are not validated.
    /// Both should come from [`http_client_builder`].
    pub fn from_clients(
        client: Client,
        insecure_client: Client,
        user_agent: impl Into<String>,
        cache: Option<Arc<dyn PageStore>>,
    ) -> Self {
        Self {
            client,
            insecure_client,
            cache,
            user_agent: user_agent.into(),
        }
    }

    /// The page cache this fetcher reads through, if any
    pub fn cache(&self) -> Option<&Arc<dyn PageStore>> {
        self.cache.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetches a URL given as user input, with or without a scheme
    ///
    /// # Request Flow
    ///
    /// 1. Work out candidate schemes: the explicit scheme, else the hint,
    ///    else https then http
    /// 2. If caching is on, return the first cached candidate (no network I/O)
    /// 3. If the scheme is unknown and reachability validation is on, probe
    ///    the candidates with HEAD requests and keep the first that answers
    ///    with a success or redirect status. An https candidate that fails
    ///    at the transport level is retried without certificate validation.
    /// 4. GET the page, following redirects up to the redirect scope, and
    ///    write it through to the cache
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | No candidate scheme answered | `SchemeResolution` |
    /// | Non-2xx status | `Status` |
    /// | Connection, TLS or timeout error | `Network` |
    /// | Non-textual content type | `UnsupportedContent` |
    /// | Unparseable input | `InvalidUrl` |
    /// | Redirect leaving the redirect scope | `OutOfScopeRedirect` |
    /// | Redirect chain too long or looping | `TooManyRedirects`, `RedirectLoop` |
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
        let invalid = |source: UrlError| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        };

        let (explicit, rest) = split_scheme(url);
        let explicit = explicit
            .map(str::parse::<Scheme>)
            .transpose()
            .map_err(invalid)?;

        let schemes = match (explicit, options.scheme_hint) {
            (Some(scheme), _) | (None, Some(scheme)) => vec![scheme],
            (None, None) => Scheme::PREFERENCE.to_vec(),
        };

        let mut candidates = Vec::with_capacity(schemes.len());
        for scheme in schemes {
            let mut candidate = with_scheme(rest, scheme).map_err(invalid)?;
            candidate.set_fragment(None);
            normalize_url(candidate.as_str()).map_err(invalid)?;
            candidates.push((scheme, candidate));
        }

        if let Some(page) = self.lookup_cache(&candidates, options) {
            if let Some(scope) = &options.redirect_scope {
                if !scope.allows(&page.resolved_url) {
                    return Err(FetchError::OutOfScopeRedirect {
                        url: page.requested_url.to_string(),
                        location: page.resolved_url,
                    });
                }
            }
            return Ok(page);
        }

        let must_probe =
            explicit.is_none() && options.scheme_hint.is_none() && options.validate_reachability;

        let (scheme, target, verify) = if must_probe {
            self.probe(url, &candidates, options).await?
        } else {
            let (scheme, target) = candidates.remove(0);
            (scheme, target, options.validate_certificate)
        };

        self.download(scheme, target, verify, options).await
    }

    /// Fetches an absolute URL, such as a link discovered during a crawl
    pub async fn fetch_url(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        self.fetch(url.as_str(), options).await
    }

    fn lookup_cache(&self, candidates: &[(Scheme, Url)], options: &FetchOptions) -> Option<FetchedPage> {
        if !options.use_cache {
            return None;
        }
        let cache = self.cache.as_ref()?;

        candidates.iter().find_map(|(scheme, candidate)| {
            let entry = cache.get(&CacheKey::for_url(candidate))?;
            tracing::debug!("Serving {} from cache", candidate);

            let resolved_url = Url::parse(&entry.resolved_url).unwrap_or_else(|_| candidate.clone());
            Some(FetchedPage {
                scheme: Scheme::of(&resolved_url).unwrap_or(*scheme),
                content: entry.content,
                requested_url: candidate.clone(),
                resolved_url,
                status: 200,
                from_cache: true,
                certificate_valid: options.validate_certificate,
            })
        })
    }

    /// Probes candidates in order and returns the first reachable one,
    /// with whether its certificate was validated
    async fn probe(
        &self,
        url: &str,
        candidates: &[(Scheme, Url)],
        options: &FetchOptions,
    ) -> Result<(Scheme, Url, bool), FetchError> {
        for (scheme, candidate) in candidates {
            for &verify in certificate_attempts(*scheme, options.validate_certificate) {
                tracing::debug!("Probing {} (verify certificate: {})", candidate, verify);
                match self
                    .client(verify)
                    .head(candidate.clone())
                    .timeout(options.timeout)
                    .send()
                    .await
                {
                    Ok(response) if is_reachable(&response) => {
                        if !verify && options.validate_certificate {
                            tracing::warn!(
                                "{} only answers without certificate validation",
                                candidate
                            );
                        }
                        tracing::debug!("Resolved {} to {}", url, candidate);
                        return Ok((*scheme, candidate.clone(), verify));
                    }
                    Ok(response) => {
                        tracing::debug!("Probe of {} returned {}", candidate, response.status());
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("Probe of {} failed: {}", candidate, e);
                    }
                }
            }
        }

        Err(FetchError::SchemeResolution {
            url: url.to_string(),
        })
    }

    async fn download(
        &self,
        scheme: Scheme,
        target: Url,
        verify: bool,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        let client = self.client(verify);
        let mut current = target.clone();
        let mut seen = HashSet::from([current.to_string()]);

        let response = loop {
            tracing::debug!("GET {}", current);
            let response = client
                .get(current.clone())
                .timeout(options.timeout)
                .send()
                .await
                .map_err(|source| FetchError::Network {
                    url: current.to_string(),
                    source,
                })?;

            let Some(next) = redirect_location(&current, &response) else {
                break response;
            };

            if seen.len() > MAX_REDIRECTS {
                return Err(FetchError::TooManyRedirects {
                    url: target.to_string(),
                });
            }
            if !seen.insert(next.to_string()) {
                return Err(FetchError::RedirectLoop {
                    url: next.to_string(),
                });
            }
            if let Some(scope) = &options.redirect_scope {
                if !scope.allows(&next) {
                    return Err(FetchError::OutOfScopeRedirect {
                        url: target.to_string(),
                        location: next,
                    });
                }
            }

            tracing::debug!("{} redirects to {}", current, next);
            current = next;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(FetchError::UnsupportedContent {
                    url: current.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let content = response.text().await.map_err(|source| FetchError::Network {
            url: current.to_string(),
            source,
        })?;

        if options.use_cache {
            if let Some(cache) = &self.cache {
                let entry = CacheEntry::new(&target, content.as_str()).with_resolved_url(&current);
                if let Err(e) = cache.put(&entry) {
                    tracing::warn!("Failed to cache {}: {}", target, e);
                }
            }
        }

        Ok(FetchedPage {
            scheme: Scheme::of(&current).unwrap_or(scheme),
            content,
            requested_url: target,
            resolved_url: current,
            status: status.as_u16(),
            from_cache: false,
            certificate_valid: verify,
        })
    }

    fn client(&self, verify_certificate: bool) -> &Client {
        if verify_certificate {
            &self.client
        } else {
            &self.insecure_client
        }
    }
}

/// Certificate checks to try, in order, when probing a candidate
///
/// An https candidate that fails with certificate validation gets a second
/// attempt without it. Plain http has no certificate to check.
fn certificate_attempts(scheme: Scheme, validate_certificate: bool) -> &'static [bool] {
    match (scheme, validate_certificate) {
        (_, false) => &[false],
        (Scheme::Https, true) => &[true, false],
        (Scheme::Http, true) => &[true],
    }
}

/// Redirects are answered by hand, so a 3xx still shows the host is up
fn is_reachable(response: &Response) -> bool {
    response.status().is_success() || response.status().is_redirection()
}

/// The next hop of a redirect response, if it is one we can follow
fn redirect_location(current: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let mut next = current.join(location).ok()?;
    next.set_fragment(None);
    Scheme::of(&next).map(|_| next)
}
/// Returns true for content types whose body we can search as text
fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || mime == "application/xhtml+xml"
        || mime == "application/xml"
}
