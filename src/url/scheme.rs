use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Transport scheme of a crawled URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    /// Order in which schemes are probed when none is known: secure first
    pub const PREFERENCE: [Scheme; 2] = [Scheme::Https, Scheme::Http];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }

    /// Returns the scheme of a parsed URL, if it is one we fetch
    pub fn of(url: &Url) -> Option<Self> {
        url.scheme().parse().ok()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            other => Err(UrlError::InvalidScheme(other.to_string())),
        }
    }
}

/// Splits user input into an explicit scheme (if any) and the remainder
///
/// `www.example.com/about` has no scheme, `https://example.com/` has one.
/// Input such as `localhost:8080` is treated as scheme-less, since only a
/// `://` separator marks a scheme.
///
/// # Examples
///
/// ```
/// use trawl::url::split_scheme;
///
/// assert_eq!(split_scheme("https://example.com/"), (Some("https"), "example.com/"));
/// assert_eq!(split_scheme("www.example.com"), (None, "www.example.com"));
/// ```
pub fn split_scheme(input: &str) -> (Option<&str>, &str) {
    let input = input.trim();
    match input.find("://") {
        Some(idx) => (Some(&input[..idx]), &input[idx + 3..]),
        None => (None, input),
    }
}

/// Builds a full URL from a scheme-less remainder and a scheme
pub fn with_scheme(rest: &str, scheme: Scheme) -> UrlResult<Url> {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    Url::parse(&format!("{}://{}", scheme, rest)).map_err(|e| UrlError::Parse(e.to_string()))
}
