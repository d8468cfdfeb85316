use serde::Deserialize;
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use trawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Which hosts a crawl may follow links into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainScope {
    /// Only the root's own host
    #[default]
    Host,
    /// The root's host and any subdomain of it
    Subdomains,
}

impl DomainScope {
    /// Returns true if `candidate` is inside the scope of `root_host`
    ///
    /// Both hosts are expected in lowercase, as returned by [`extract_domain`].
    pub fn contains(&self, root_host: &str, candidate: &str) -> bool {
        match self {
            Self::Host => candidate == root_host,
            Self::Subdomains => {
                candidate == root_host
                    || candidate
                        .strip_suffix(root_host)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// Returns the first path segment of a URL (the "branch" it lives in)
///
/// The root path has no branch.
pub fn first_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
