//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a crawl,
//! including matches per search key, statistics and failures.

use crate::crawler::CrawlResult;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown report of a crawl
///
/// # Arguments
///
/// * `result` - The crawl result
/// * `config_hash` - Hash of the configuration that produced it, if known
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(
    result: &CrawlResult,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(result, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl result as markdown
pub fn format_markdown_report(result: &CrawlResult, config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Trawl Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Root**: {}\n", result.root()));
    md.push_str(&format!("- **Resolved Root**: {}\n", result.resolved_root()));
    md.push_str(&format!("- **Scheme**: {}\n", result.scheme()));
    md.push_str(&format!("- **Started**: {}\n", result.started_at().to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", result.finished_at().to_rfc3339()));
    let duration = (result.finished_at() - result.started_at()).num_milliseconds() as f64 / 1000.0;
    md.push_str(&format!("- **Duration**: {:.2} seconds\n", duration));
    md.push_str(&format!(
        "- **Stopped Early**: {}\n",
        if result.stopped_early() { "yes" } else { "no" }
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Fetched**: {}\n", result.visited_urls().len()));
    md.push_str(&format!("- **Pages Failed**: {}\n", result.failed_urls().len()));
    md.push_str(&format!("- **Total Matches**: {}\n", result.match_count()));
    md.push_str(&format!(
        "- **External Hosts**: {}\n\n",
        result.external_hosts().len()
    ));

    // Matches per key
    md.push_str("## Matches\n\n");
    md.push_str("| Key | Matches |\n");
    md.push_str("|-----|---------|\n");
    for (key, matches) in result.matches() {
        md.push_str(&format!("| {} | {} |\n", key, matches.len()));
    }
    md.push('\n');

    for (key, matches) in result.matches() {
        if matches.is_empty() {
            continue;
        }
        md.push_str(&format!("### {}\n\n", key));
        md.push_str("| Match | Found On |\n");
        md.push_str("|-------|----------|\n");
        let origins = result.found_on().get(key);
        for (i, m) in matches.iter().enumerate() {
            let origin = origins.and_then(|o| o.get(i)).map(String::as_str).unwrap_or("");
            md.push_str(&format!("| {} | {} |\n", escape_cell(m), origin));
        }
        md.push('\n');
    }

    // Failures
    if !result.failed_urls().is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | Reason |\n");
        md.push_str("|-----|--------|\n");
        for failed in result.failed_urls() {
            md.push_str(&format!(
                "| {} | {} |\n",
                failed.url,
                escape_cell(&failed.reason)
            ));
        }
        md.push('\n');
    }

    // External hosts
    if !result.external_hosts().is_empty() {
        md.push_str("## External Hosts\n\n");
        for host in result.external_hosts().iter().take(50) {
            md.push_str(&format!("- {}\n", host));
        }
        if result.external_hosts().len() > 50 {
            md.push_str(&format!(
                "\n... and {} more\n",
                result.external_hosts().len() - 50
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
