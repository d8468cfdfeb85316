//! Robots.txt handling module
//!
//! Crawls ignore robots.txt unless asked to respect it. When they do, the
//! rules are fetched once per crawl from the root's origin.

mod parser;

pub use parser::RobotsRules;

use crate::crawler::{FetchOptions, Fetcher};
use url::Url;

/// Fetches robots.txt for the origin of `base`
///
/// Never fails: a missing or unreachable robots.txt allows everything.
/// The page cache is bypassed.
pub async fn fetch_robots(fetcher: &Fetcher, base: &Url, options: &FetchOptions) -> RobotsRules {
    let robots_url = match base.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL for {}: {}", base, e);
            return RobotsRules::allow_all();
        }
    };

    let options = FetchOptions {
        use_cache: false,
        ..options.clone()
    };

    match fetcher.fetch_url(&robots_url, &options).await {
        Ok(page) => {
            tracing::debug!("Loaded {}", robots_url);
            RobotsRules::from_content(&page.content)
        }
        Err(e) => {
            tracing::debug!("No usable robots.txt at {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}

