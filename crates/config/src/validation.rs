//! Configuration validation

use crate::{AppConfig, ConfigError, PoolRegistry, Result};
use solana_pubkey::Pubkey;
use stakeflow_types::NotificationConfig;
use std::collections::HashSet;
use std::str::FromStr;

/// Upper bound on the post-batch refresh delay (milliseconds)
pub const MAX_SETTLEMENT_DELAY_MS: u64 = 60_000;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Network
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    if let Err(e) = validate_url(&config.network.rpc_url) {
        errors.push(ValidationError::new("network.rpc_url", e));
    }

    // Pool selection
    if config.pool.stake_pool.trim().is_empty() {
        errors.push(ValidationError::new(
            "pool.stake_pool",
            "stake pool name or address is required",
        ));
    } else if PoolRegistry::from_config(config)
        .resolve(&config.pool.stake_pool)
        .is_none()
    {
        errors.push(ValidationError::new(
            "pool.stake_pool",
            format!(
                "'{}' is neither a known pool name nor a valid address",
                config.pool.stake_pool
            ),
        ));
    }

    // Known pools
    let mut names = HashSet::new();
    for (idx, pool) in config.pools.iter().enumerate() {
        if pool.name.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("pools[{idx}].name"),
                "pool name must not be empty",
            ));
        }
        if !names.insert(pool.name.as_str()) {
            errors.push(ValidationError::new(
                format!("pools[{idx}].name"),
                format!("duplicate pool name '{}'", pool.name),
            ));
        }
        if Pubkey::from_str(&pool.address).is_err() {
            errors.push(ValidationError::new(
                format!("pools[{idx}].address"),
                format!("'{}' is not a valid address", pool.address),
            ));
        }
    }

    // Refresh
    if config.refresh.settlement_delay_ms == 0 {
        errors.push(ValidationError::new(
            "refresh.settlement_delay_ms",
            "must be greater than 0",
        ));
    }

    if config.refresh.settlement_delay_ms > MAX_SETTLEMENT_DELAY_MS {
        errors.push(ValidationError::new(
            "refresh.settlement_delay_ms",
            format!("must be <= {MAX_SETTLEMENT_DELAY_MS}"),
        ));
    }

    // Notifications
    let messages = [
        ("notifications.stake", &config.notifications.stake),
        ("notifications.unstake", &config.notifications.unstake),
        ("notifications.cooldown", &config.notifications.cooldown),
        ("notifications.claim", &config.notifications.claim),
    ];
    for (field, message) in messages {
        if let Err(e) = validate_message(message) {
            errors.push(ValidationError::new(format!("{field}.message"), e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Err(ConfigError::ValidationError(error_messages.join("; ")))
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!("invalid log level '{level}', must be one of: trace, debug, info, warn, error"),
        )),
    }
}

fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL must not be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!("URL '{url}' must start with http:// or https://"));
    }

    Ok(())
}

fn validate_message(message: &NotificationConfig) -> std::result::Result<(), String> {
    if message.message.trim().is_empty() {
        return Err("message must not be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PoolMetadata;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.pool.stake_pool = "degens".to_string();
        config.pools.push(PoolMetadata {
            name: "degens".to_string(),
            address: "3EyzFXhsVXApzPHhz9QcBaQryGicQxzeN5YZ43KRVDba".to_string(),
            receipt_kind: None,
            token_standard: None,
        });
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        assert!(validate_log_level("info").is_ok());
        assert!(validate_log_level("DEBUG").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://api.devnet.solana.com").is_ok());
        assert!(validate_url("http://127.0.0.1:8899").is_ok());
        assert!(validate_url("api.devnet.solana.com").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_unresolvable_pool() {
        let mut config = valid_config();
        config.pool.stake_pool = "missing".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("pool.stake_pool"));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.refresh.settlement_delay_ms = 0;
        config.notifications.claim.message = "  ".to_string();
        config.pools.push(PoolMetadata {
            name: "degens".to_string(),
            address: "xyz".to_string(),
            receipt_kind: None,
            token_standard: None,
        });

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("refresh.settlement_delay_ms"));
        assert!(err.contains("notifications.claim.message"));
        assert!(err.contains("duplicate pool name"));
        assert!(err.contains("pools[1].address"));
    }
}
