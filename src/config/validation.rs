use crate::config::types::{Config, DiscoveryConfig, PipelineConfig, RenderConfig, WorkerConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_discovery_config(&config.discovery)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_worker_config(&config.worker)?;
    validate_render_config(&config.render)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.listing_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "listing-url must use HTTP(S), got scheme '{}'",
            url.scheme()
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page-size must be >= 1".to_string(),
        ));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates pipeline configuration
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 100 {
        return Err(ConfigError::Validation(format!(
            "worker-count must be between 1 and 100, got {}",
            config.worker_count
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue-capacity must be >= 1".to_string(),
        ));
    }

    if config.dequeue_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "dequeue-timeout-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates per-item worker configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.parse_attempts < 1 {
        return Err(ConfigError::Validation(
            "parse-attempts must be >= 1".to_string(),
        ));
    }

    if config.settle_min_ms > config.settle_max_ms {
        return Err(ConfigError::Validation(format!(
            "settle-min-ms ({}) must not exceed settle-max-ms ({})",
            config.settle_min_ms, config.settle_max_ms
        )));
    }

    Ok(())
}

/// Validates render client configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.error_page_dir.is_empty() {
        return Err(ConfigError::Validation(
            "error-page-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::OutputConfig;

    fn valid_config() -> Config {
        Config {
            discovery: DiscoveryConfig {
                listing_url: "https://example.com/jobs/search/?keywords=rust".to_string(),
                page_size: 25,
                max_pages: 8,
                max_reveal_attempts: 10,
                page_settle_ms: 2000,
                reveal_wait_ms: 500,
            },
            pipeline: PipelineConfig::default(),
            worker: WorkerConfig::default(),
            render: RenderConfig::default(),
            output: OutputConfig {
                database_path: "./jobs.db".to_string(),
                csv_path: "./jobs.csv".to_string(),
                error_page_dir: "./error_pages".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_bad_listing_url() {
        let mut config = valid_config();
        config.discovery.listing_url = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = valid_config();
        config.discovery.listing_url = "ftp://example.com/jobs".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = valid_config();
        config.pipeline.worker_count = 0;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_rejects_inverted_settle_range() {
        let mut config = valid_config();
        config.worker.settle_min_ms = 3000;
        config.worker.settle_max_ms = 1000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_user_agents() {
        let mut config = valid_config();
        config.render.user_agents.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_database_path() {
        let mut config = valid_config();
        config.output.database_path = String::new();
        assert!(validate(&config).is_err());
    }
}
