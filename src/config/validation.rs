use crate::config::types::{Config, PollerConfig, SiteEntry, UserAgentConfig};
use crate::site::SiteFamily;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_poller_config(&config.poller)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates polling configuration
fn validate_poller_config(config: &PollerConfig) -> Result<(), ConfigError> {
    // concurrency == 0 is meaningful (uncapped), so no lower bound
    if config.interval == 0 {
        return Err(ConfigError::Validation(
            "interval must be at least 1 second".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be at least 1 second".to_string(),
        ));
    }

    if config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout must be at least 1 second".to_string(),
        ));
    }

    if config.cycle_timeout == Some(0) {
        return Err(ConfigError::Validation(
            "cycle-timeout must be at least 1 second when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "user-agent name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.name
        )));
    }

    Ok(())
}

/// Validates custom site definitions
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for entry in sites {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name cannot be empty".to_string(),
            ));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is defined more than once",
                entry.name
            )));
        }

        if SiteFamily::parse(&entry.family).is_none() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has unknown family '{}'",
                entry.name, entry.family
            )));
        }

        validate_base_url(&entry.name, &entry.api_base)?;
        if let Some(media_base) = &entry.media_base {
            validate_base_url(&entry.name, media_base)?;
        }

        if !matches!(entry.listing.as_str(), "threads" | "catalog") {
            return Err(ConfigError::Validation(format!(
                "site '{}' listing must be \"threads\" or \"catalog\", got '{}'",
                entry.name, entry.listing
            )));
        }

        if entry.thread_dir.is_empty() || entry.thread_dir.contains('/') {
            return Err(ConfigError::Validation(format!(
                "site '{}' thread-dir must be a single path segment",
                entry.name
            )));
        }
    }

    Ok(())
}

fn validate_base_url(site: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("site '{}': '{}': {}", site, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "site '{}': base URL must use http or https, got '{}'",
            site, raw
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "site '{}': '{}' cannot be used as a base URL",
            site, raw
        )));
    }

    Ok(())
}
