use crate::config::types::{Config, CrawlerConfig, OutputConfig, ScoringConfig, SiteConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_scoring_config(&config.scoring)?;
    Ok(())
}

/// Validates the target site
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site url '{}': {}", config.url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Site url '{}' must use HTTP or HTTPS",
            config.url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Site url '{}' has no host",
            config.url
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_cap < 1 || config.page_cap > 100_000 {
        return Err(ConfigError::Validation(format!(
            "page_cap must be between 1 and 100000, got {}",
            config.page_cap
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    if config.persist_batch_size < 1 {
        return Err(ConfigError::Validation(
            "persist_batch_size must be >= 1".to_string(),
        ));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Weights must be non-negative and ordered error >= warning >= notice
fn validate_scoring_config(config: &ScoringConfig) -> Result<(), ConfigError> {
    let weights = [config.error_weight, config.warning_weight, config.notice_weight];
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::Validation(
            "scoring weights must be finite and non-negative".to_string(),
        ));
    }

    if config.error_weight < config.warning_weight || config.warning_weight < config.notice_weight {
        return Err(ConfigError::Validation(format!(
            "scoring weights must decrease by severity, got error={} warning={} notice={}",
            config.error_weight, config.warning_weight, config.notice_weight
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_validate_site_url() {
        let ok = SiteConfig {
            url: "https://example.com/".to_string(),
        };
        assert!(validate_site_config(&ok).is_ok());

        let ftp = SiteConfig {
            url: "ftp://example.com/".to_string(),
        };
        assert!(validate_site_config(&ftp).is_err());

        let garbage = SiteConfig {
            url: "not a url".to_string(),
        };
        assert!(matches!(
            validate_site_config(&garbage),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_page_cap_bounds() {
        let mut crawler = CrawlerConfig::default();
        assert!(validate_crawler_config(&crawler).is_ok());

        crawler.page_cap = 0;
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_scoring_weights_must_decrease() {
        let inverted = ScoringConfig {
            error_weight: 1.0,
            warning_weight: 3.0,
            notice_weight: 10.0,
        };
        assert!(validate_scoring_config(&inverted).is_err());
        assert!(validate_scoring_config(&ScoringConfig::default()).is_ok());
    }
}
