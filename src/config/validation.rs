//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check content roots are sane relative paths
//! - Validate value ranges (timeouts > 0)
//! - Check sync settings are complete when sync is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ArborConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ArborConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Validate a parsed configuration, collecting every failure.
pub fn validate_config(config: &ArborConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(err("server.bind_address", "not a valid socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(err("server.request_timeout_secs", "must be greater than zero"));
    }

    if config.content.roots.is_empty() {
        errors.push(err("content.roots", "at least one base directory is required"));
    }
    for root in &config.content.roots {
        if root.is_empty() || root.contains('/') || root.contains('\\') {
            errors.push(err("content.roots", "entries must be bare directory names"));
        }
    }
    if config.content.handler_extension.is_empty()
        || config.content.handler_extension.contains('.')
    {
        errors.push(err(
            "content.handler_extension",
            "must be a bare extension without a dot",
        ));
    }

    if config.cache.handler_timeout_secs == 0 {
        errors.push(err("cache.handler_timeout_secs", "must be greater than zero"));
    }

    if config.sync.enabled {
        if config.sync.secret.is_empty() {
            errors.push(err("sync.secret", "required when sync is enabled"));
        }
        if !config.sync.payload_path.starts_with('/') {
            errors.push(err("sync.payload_path", "must start with '/'"));
        }
        if config.sync.branch.is_empty() {
            errors.push(err("sync.branch", "must not be empty"));
        }
        if config.sync.fetch_attempts == 0 {
            errors.push(err("sync.fetch_attempts", "must be greater than zero"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ArborConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ArborConfig::default();
        config.server.bind_address = "nonsense".into();
        config.server.request_timeout_secs = 0;
        config.content.roots.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn sync_requires_secret() {
        let mut config = ArborConfig::default();
        config.sync.enabled = true;
        config.sync.secret = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "sync.secret"));
    }

    #[test]
    fn payload_path_must_be_absolute() {
        let mut config = ArborConfig::default();
        config.sync.enabled = true;
        config.sync.secret = "s3cret".into();
        config.sync.payload_path = "hook".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "sync.payload_path"));
    }
}
