use crate::config::types::{CacheConfig, Config, CrawlConfig, FetchConfig, UserAgentConfig};
use crate::url::{normalize_url, split_scheme, with_scheme, Scheme};
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetch_config(&config.fetch)?;
    validate_cache_config(&config.cache)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_searches(config)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_root(&config.root)?;

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_branch_count == Some(0) {
        return Err(ConfigError::Validation(
            "max_branch_count must be >= 1 when set".to_string(),
        ));
    }

    for hint in &config.sort_order_hints {
        RegexBuilder::new(hint)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::InvalidPattern(format!("Invalid sort hint '{}': {}", hint, e))
            })?;
    }

    Ok(())
}

/// Checks that the root is a usable URL, with or without a scheme
fn validate_root(root: &str) -> Result<(), ConfigError> {
    if root.trim().is_empty() {
        return Err(ConfigError::Validation("root cannot be empty".to_string()));
    }

    let (scheme, rest) = split_scheme(root);
    let scheme = match scheme {
        Some(s) => s
            .parse::<Scheme>()
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root '{}': {}", root, e)))?,
        None => Scheme::Https,
    };

    with_scheme(rest, scheme)
        .and_then(|url| normalize_url(url.as_str()))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root '{}': {}", root, e)))?;

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }
    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Compiles every search and checks the keys other tables refer to
fn validate_searches(config: &Config) -> Result<(), ConfigError> {
    for (key, pattern) in &config.searches {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search keys cannot be empty".to_string(),
            ));
        }
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid pattern for '{}': {}", key, e))
        })?;
    }

    for key in &config.crawl.stop_on_keys {
        if !config.searches.contains_key(key) {
            return Err(ConfigError::Validation(format!(
                "stop key '{}' has no entry in [searches]",
                key
            )));
        }
    }

    for key in config.match_policy.keys() {
        if !config.searches.contains_key(key) {
            return Err(ConfigError::Validation(format!(
                "match policy for '{}' has no entry in [searches]",
                key
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
