// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and sane
//! retry budgets.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.chat_api.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat_api.max_attempts must be at least 1, got {}",
                config.chat_api.max_attempts
            ),
        });
    }

    if config.chat_api.max_concurrent_sends < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat_api.max_concurrent_sends must be at least 1, got {}",
                config.chat_api.max_concurrent_sends
            ),
        });
    }

    if config.responder.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "responder.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.handoff.cas_max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "handoff.cas_max_attempts must be at least 1, got {}",
                config.handoff.cas_max_attempts
            ),
        });
    }

    for (i, keyword) in config.handoff.escalation_keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("handoff.escalation_keywords[{i}] must not be empty"),
            });
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
    fn default_config_validates() {
        let config = ParleyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ParleyConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_retry_budget_fails_validation() {
        let mut config = ParleyConfig::default();
        config.chat_api.max_attempts = 0;
        config.handoff.cas_max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn blank_escalation_keyword_fails_validation() {
        let mut config = ParleyConfig::default();
        config.handoff.escalation_keywords = vec!["human".to_string(), "  ".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("escalation_keywords"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = ParleyConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.webhook.app_secret = Some("s3cret".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
