//! Configuration loading from disk.
//!
//! # Responsibilities
//! - Read and parse the TOML configuration file
//! - Run semantic validation before the config is accepted

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ArborConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Failure to turn a TOML file into an accepted [`ArborConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ArborConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ArborConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_joined_in_the_message() {
        let err = ConfigError::Validation(vec![
            ValidationError {
                field: "server.bind_address".into(),
                message: "not a valid socket address".into(),
            },
            ValidationError {
                field: "content.roots".into(),
                message: "at least one base directory is required".into(),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("invalid configuration: "));
        assert!(message.contains("server.bind_address: not a valid socket address"));
        assert!(message.contains(", content.roots:"));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
