//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing a plain-text summary of a crawl
//! - Exporting results as JSON
//! - Writing a markdown report

mod json;
mod markdown;

pub use json::{to_json_string, write_json};
pub use markdown::{format_markdown_report, generate_markdown_report};

use crate::crawler::CrawlResult;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Prints a crawl summary to stdout
pub fn print_summary(result: &CrawlResult) {
    println!("{}", result);
    println!();

    println!("=== Crawl Statistics ===\n");
    println!("Overview:");
    println!("  Root: {} ({})", result.root(), result.resolved_root());
    println!("  Pages fetched: {}", result.visited_urls().len());
    println!("  Pages failed: {}", result.failed_urls().len());
    println!("  Matches: {}", result.match_count());
    println!("  External hosts: {}", result.external_hosts().len());
    if result.stopped_early() {
        println!("  Stopped early: all stop keys satisfied");
    }
    println!(
        "  Duration: {:.2}s",
        (result.finished_at() - result.started_at()).num_milliseconds() as f64 / 1000.0
    );
    println!();

    if !result.failed_urls().is_empty() {
        println!("Failed URLs:");
        for failed in result.failed_urls() {
            println!("  - {}: {}", failed.url, failed.reason);
        }
        println!();
    }
}
