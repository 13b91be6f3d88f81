//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Default prefix for environment overrides
pub const ENV_PREFIX: &str = "STAKEFLOW";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading configuration file");

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables with the default prefix
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Sections are separated by a double underscore so that keys may contain
    /// single underscores, e.g. `STAKEFLOW_NETWORK__RPC_URL`.
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(env_source(prefix))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Merge two configurations, with overlay taking precedence
    ///
    /// Pools are merged by name; every other section is taken from the overlay.
    pub fn merge(base: AppConfig, overlay: AppConfig) -> AppConfig {
        let mut pools = base.pools;
        for pool in overlay.pools {
            match pools.iter_mut().find(|p| p.name == pool.name) {
                Some(existing) => *existing = pool,
                None => pools.push(pool),
            }
        }

        AppConfig {
            network: overlay.network,
            pool: overlay.pool,
            refresh: overlay.refresh,
            notifications: overlay.notifications,
            pools,
        }
    }

    /// Load configuration from file with environment variable overrides
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        let file_config = Self::from_file(path)?;

        // A partial environment cannot deserialize on its own; keep the file config
        match Self::from_env_with_prefix(env_prefix) {
            Ok(env_config) => Ok(Self::merge(file_config, env_config)),
            Err(e) => {
                debug!(error = %e, "no complete environment override");
                Ok(file_config)
            }
        }
    }

    /// Build configuration using the config crate's builder pattern
    ///
    /// Later sources override earlier ones key by key.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Builder for layered configuration loading
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(env_source(prefix));
        self
    }

    /// Set a default value for a dotted key such as `refresh.settlement_delay_ms`
    pub fn set_default(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_default(key, value)?;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Environment as NetworkEnvironment, PoolMetadata};
    use std::io::Write;

    const TOML: &str = r#"
        [network]
        environment = "devnet"
        rpc_url = "https://api.devnet.solana.com"
        log_level = "debug"

        [pool]
        stake_pool = "degens"
        receipt_kind = "receipt"

        [refresh]
        settlement_delay_ms = 3000

        [[pools]]
        name = "degens"
        address = "3EyzFXhsVXApzPHhz9QcBaQryGicQxzeN5YZ43KRVDba"
        token_standard = "non_fungible"
    "#;

    #[test]
    fn test_load_from_toml() {
        let config = ConfigLoader::from_toml(TOML).unwrap();
        assert_eq!(config.network.environment, NetworkEnvironment::Devnet);
        assert_eq!(config.network.log_level, "debug");
        assert_eq!(config.refresh.settlement_delay_ms, 3000);
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.notifications.stake.message, "Successfully staked");
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
network:
  environment: mainnet
  rpc_url: "https://api.mainnet-beta.solana.com"

pool:
  stake_pool: "3EyzFXhsVXApzPHhz9QcBaQryGicQxzeN5YZ43KRVDba"

notifications:
  claim:
    message: "Rewards claimed"
        "#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.network.environment, NetworkEnvironment::Mainnet);
        assert_eq!(config.network.log_level, "info");
        assert_eq!(config.refresh.settlement_delay_ms, 2000);
        assert_eq!(config.notifications.claim.message, "Rewards claimed");
        assert!(config.notifications.claim.description.is_none());
        assert_eq!(config.notifications.unstake.message, "Successfully unstaked");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "network": {
    "environment": "local",
    "rpc_url": "http://127.0.0.1:8899",
    "metrics_enabled": false
  },
  "pool": {
    "stake_pool": "degens",
    "token_standard": "fungible"
  },
  "pools": [
    { "name": "degens", "address": "3EyzFXhsVXApzPHhz9QcBaQryGicQxzeN5YZ43KRVDba" }
  ]
}
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert!(!config.network.metrics_enabled);
        assert_eq!(config.pool.stake_pool, "degens");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(TOML.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.network.log_level, "debug");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_merge_configs() {
        let mut base = ConfigLoader::from_toml(TOML).unwrap();
        base.pools.push(PoolMetadata {
            name: "other".to_string(),
            address: "11111111111111111111111111111111".to_string(),
            receipt_kind: None,
            token_standard: None,
        });

        let mut overlay = AppConfig::default();
        overlay.pool.stake_pool = "other".to_string();
        overlay.pools.push(PoolMetadata {
            name: "degens".to_string(),
            address: "3EyzFXhsVXApzPHhz9QcBaQryGicQxzeN5YZ43KRVDba".to_string(),
            receipt_kind: None,
            token_standard: None,
        });

        let merged = ConfigLoader::merge(base, overlay);
        assert_eq!(merged.network.environment, NetworkEnvironment::Local);
        assert_eq!(merged.pool.stake_pool, "other");
        assert_eq!(merged.pools.len(), 2);
        assert!(merged.pools[0].token_standard.is_none());
    }

    #[test]
    fn test_builder_layers_file_and_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(TOML.as_bytes()).unwrap();

        let config = ConfigLoader::builder()
            .set_default("network.log_level", "warn")
            .unwrap()
            .add_file(file.path(), true)
            .build()
            .unwrap();

        assert_eq!(config.network.log_level, "debug");
        assert_eq!(config.refresh.settlement_delay_ms, 3000);
    }
}
