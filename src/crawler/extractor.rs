//! Pattern extraction
//!
//! A [`SearchSpec`] maps search keys to compiled regular expressions.
//! [`extract`] runs every pattern over a piece of content and reports the
//! matches per key.

use crate::TrawlError;
use regex::Regex;
use std::collections::BTreeMap;

/// Named patterns searched for on every crawled page
///
/// Keys are unique and iterate in sorted order.
#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    patterns: BTreeMap<String, Regex>,
}

impl SearchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a set of `(key, pattern)` pairs
    ///
    /// # Errors
    ///
    /// Returns `TrawlError::InvalidPattern` naming the first key whose
    /// pattern does not compile.
    ///
    /// # Example
    ///
    /// ```
    /// use trawl::crawler::SearchSpec;
    ///
    /// let spec = SearchSpec::from_patterns([("zip", r"\d{4}\s?[A-Z]{2}")]).unwrap();
    /// assert!(spec.contains_key("zip"));
    /// ```
    pub fn from_patterns<I, K, P>(patterns: I) -> Result<Self, TrawlError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        patterns
            .into_iter()
            .try_fold(Self::new(), |spec, (key, pattern)| {
                spec.with_pattern(key, pattern.as_ref())
            })
    }

    /// Adds (or replaces) a pattern, compiling it first
    pub fn with_pattern(mut self, key: impl Into<String>, pattern: &str) -> Result<Self, TrawlError> {
        let key = key.into();
        let regex = Regex::new(pattern).map_err(|source| TrawlError::InvalidPattern {
            key: key.clone(),
            source,
        })?;
        self.patterns.insert(key, regex);
        Ok(self)
    }

    /// Adds an already compiled pattern
    pub fn insert(&mut self, key: impl Into<String>, regex: Regex) -> Option<Regex> {
        self.patterns.insert(key.into(), regex)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.patterns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Regex> {
        self.patterns.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.patterns.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Runs every pattern of `spec` over `content`
///
/// Every key of `spec` is present in the result. Matches are listed in order
/// of appearance, trimmed of surrounding whitespace; matches that are empty
/// after trimming are dropped.
pub fn extract(content: &str, spec: &SearchSpec) -> BTreeMap<String, Vec<String>> {
    spec.iter()
        .map(|(key, regex)| {
            let found = regex
                .find_iter(content)
                .map(|m| m.as_str().trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            (key.to_string(), found)
        })
        .collect()
}
