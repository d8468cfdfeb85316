//! Configuration module for Trawl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turning them into the searches, options and fetcher a crawl
//! needs.
//!
//! # Example
//!
//! ```no_run
//! use trawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawl.max_depth);
//! ```

mod build;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, CrawlConfig, FetchConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
