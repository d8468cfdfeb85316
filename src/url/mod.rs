//! URL handling module for Trawl
//!
//! This module provides URL normalization, scheme handling, domain extraction
//! and crawl scope checks.

mod domain;
mod normalize;
mod scheme;

pub use domain::{extract_domain, first_path_segment, DomainScope};
pub use normalize::normalize_url;
pub use scheme::{split_scheme, with_scheme, Scheme};
