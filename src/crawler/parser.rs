//! HTML parser for extracting links, text and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags, frames and canonical links), with their anchor text
//! - The visible text of the page, which searches run against
//! - Page title

use scraper::node::Node;
use scraper::{Html, Selector};
use url::Url;

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL the link points to, without fragment
    pub url: String,

    /// The href attribute as written in the page
    pub href: String,

    /// Anchor text (empty for frames and canonical links)
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page, in document order
    pub links: Vec<PageLink>,

    /// Visible text nodes, trimmed, one per line
    pub text: String,
}

/// Parses HTML content and extracts links, text and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<frame src="...">` and `<iframe src="...">`
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use trawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/about">About us</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/about");
/// assert_eq!(parsed.links[0].text, "About us");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        text: extract_text(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<PageLink> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href], frame[src], iframe[src]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let is_anchor = element.value().name() == "a";
            let attr = if is_anchor { "href" } else { "src" };

            if let Some(href) = element.value().attr(attr) {
                if let Some(url) = resolve_link(href, base_url) {
                    let text = if is_anchor {
                        collapse_whitespace(&element.text().collect::<String>())
                    } else {
                        String::new()
                    };
                    links.push(PageLink {
                        url,
                        href: href.trim().to_string(),
                        text,
                    });
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    links.push(PageLink {
                        url,
                        href: href.trim().to_string(),
                        text: String::new(),
                    });
                }
            }
        }
    }

    links
}

/// Collects visible text nodes, skipping scripts and styles
fn extract_text(document: &Html) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for node in document.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    lines.join("\n")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    absolute_url.set_fragment(None);
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if the last path segment has no extension or one of `allowed`
///
/// Extensions are compared case-insensitively and without the leading dot.
/// An empty `allowed` list accepts everything.
pub fn has_allowed_extension(url: &Url, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last.rsplit_once('.') {
        None => true,
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            allowed
                .iter()
                .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        }
    }
}
