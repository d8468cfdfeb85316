//! Robots.txt rules
//!
//! Matching is delegated to the robotstxt crate.

use robotstxt::DefaultMatcher;

/// Robots.txt rules for one site
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt body; empty allows everything
    content: String,
}

impl RobotsRules {
    /// Creates rules from a raw robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow every URL
    ///
    /// Used when the site has no robots.txt or it cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to check
    /// * `user_agent` - Product token of the crawler (e.g. "trawl")
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
