use crate::url::normalize_url;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Deterministic, filesystem-safe name of a cache entry
///
/// The key is `<host>-<sha256 of the normalized URL>`. The host prefix keeps
/// cache directories browsable; the digest makes the key collision resistant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    url: String,
}

impl CacheKey {
    /// Derives the key for a URL, normalizing it first
    ///
    /// # Examples
    ///
    /// ```
    /// use trawl::cache::CacheKey;
    /// use url::Url;
    ///
    /// let a = CacheKey::for_url(&Url::parse("https://Example.com/page/#top").unwrap());
    /// let b = CacheKey::for_url(&Url::parse("https://example.com/page").unwrap());
    /// assert_eq!(a, b);
    /// assert!(a.as_str().starts_with("example.com-"));
    /// ```
    pub fn for_url(url: &Url) -> Self {
        let normalized = normalize_url(url.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let host = url.host_str().unwrap_or("nohost");
        let host: String = host
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self {
            key: format!("{}-{}", host, digest),
            url: normalized,
        }
    }

    pub(crate) fn from_raw(key: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The normalized URL this key was derived from
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
