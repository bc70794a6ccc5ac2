use crate::config::types::{ApiConfig, Config, CrawlerConfig, OutputConfig, TargetConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates an account handle: non-empty, alphanumeric and underscores only
pub fn validate_handle(handle: &str) -> Result<(), ConfigError> {
    if handle.is_empty() {
        return Err(ConfigError::InvalidHandle(
            "handle cannot be empty".to_string(),
        ));
    }

    if !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::InvalidHandle(format!(
            "handle must contain only letters, digits and underscores, got '{}'",
            handle
        )));
    }

    Ok(())
}

/// Validates the target thread
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    if config.post_id.is_empty() || !config.post_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "post_id must be a non-empty numeric identifier, got '{}'",
            config.post_id
        )));
    }

    validate_handle(&config.author)
}

/// Validates provider endpoint configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.bearer_token_env.is_empty() {
        return Err(ConfigError::Validation(
            "bearer_token_env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl pacing
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.cooldown_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "cooldown_ms must be >= 1000ms, got {}ms",
            config.cooldown_ms
        )));
    }

    if config.max_replies < 1 {
        return Err(ConfigError::Validation(format!(
            "max_replies must be >= 1, got {}",
            config.max_replies
        )));
    }

    if config.max_workers < 1 || config.max_workers > 16 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 16, got {}",
            config.max_workers
        )));
    }

    if config.replies_page_size < 1 || config.replies_page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "replies_page_size must be between 1 and 100, got {}",
            config.replies_page_size
        )));
    }

    if config.follows_page_size < 1 || config.follows_page_size > 200 {
        return Err(ConfigError::Validation(format!(
            "follows_page_size must be between 1 and 200, got {}",
            config.follows_page_size
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("edges_path", &config.edges_path),
        ("error_log_path", &config.error_log_path),
        ("dump_dir", &config.dump_dir),
        ("database_path", &config.database_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}
