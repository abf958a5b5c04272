//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Version tokens must be numeric dotted and ordered
//! - Host specs must carry a supported scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function over the config, no side effects

use thiserror::Error;

use crate::api::version::ApiVersion;
use crate::config::schema::DaemonConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid api version {0:?}: expected a numeric dotted token")]
    InvalidVersion(String),

    #[error("min_version {min} is newer than version {max}")]
    VersionRange { min: String, max: String },

    #[error("host {0:?}: expected tcp:// or unix:// scheme")]
    InvalidHost(String),

    #[error("no listener hosts configured")]
    NoHosts,

    #[error("cors_headers must be a plain ASCII header value")]
    InvalidCorsHeaders,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let version = match config.version.parse::<ApiVersion>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::InvalidVersion(config.version.clone()));
            None
        }
    };
    let min_version = match config.min_version.parse::<ApiVersion>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::InvalidVersion(config.min_version.clone()));
            None
        }
    };
    if let (Some(min), Some(max)) = (min_version, version) {
        if min > max {
            errors.push(ValidationError::VersionRange {
                min: config.min_version.clone(),
                max: config.version.clone(),
            });
        }
    }

    if config.hosts.is_empty() {
        errors.push(ValidationError::NoHosts);
    }
    for host in &config.hosts {
        if !host.starts_with("tcp://") && !host.starts_with("unix://") {
            errors.push(ValidationError::InvalidHost(host.clone()));
        }
    }

    if config.enable_cors
        && (config.cors_headers.is_empty()
            || !config.cors_headers.chars().all(|c| (' '..='~').contains(&c)))
    {
        errors.push(ValidationError::InvalidCorsHeaders);
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

    fn base_config() -> DaemonConfig {
        DaemonConfig {
            hosts: vec!["tcp://127.0.0.1:2375".to_string()],
            ..DaemonConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn rejects_bad_version_token() {
        let mut config = base_config();
        config.version = "v1.banana".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidVersion(_))));
    }

    #[test]
    fn rejects_inverted_version_range() {
        let mut config = base_config();
        config.version = "1.12".to_string();
        config.min_version = "1.40".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::VersionRange { .. })));
    }

    #[test]
    fn rejects_unknown_host_scheme_and_reports_all_errors() {
        let mut config = base_config();
        config.hosts = vec!["fd://3".to_string()];
        config.version = "nope".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_empty_host_list() {
        let mut config = base_config();
        config.hosts.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoHosts)));
    }
}
