//! Core configuration structures

use serde::{Deserialize, Serialize};
use stakeflow_types::{NotificationConfig, ReceiptKind, TokenStandard};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network configuration
    pub network: NetworkConfig,

    /// Active stake pool
    pub pool: PoolSelection,

    /// Post-batch cache refresh
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Success messages shown once a batch lands
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Known stake pools, used to resolve names
    #[serde(default)]
    pub pools: Vec<PoolMetadata>,
}

/// Network environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (mainnet, devnet, local)
    pub environment: Environment,

    /// JSON-RPC endpoint of the ledger
    pub rpc_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Devnet,
    Local,
}

impl Environment {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Environment::Mainnet => "https://api.mainnet-beta.solana.com",
            Environment::Devnet => "https://api.devnet.solana.com",
            Environment::Local => "http://127.0.0.1:8899",
        }
    }
}

/// Stake pool the orchestrator operates on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSelection {
    /// Pool name from `pools`, or a pool address
    pub stake_pool: String,

    /// Overrides the receipt kind of the pool metadata
    #[serde(default)]
    pub receipt_kind: Option<ReceiptKind>,

    /// Overrides the token standard of the pool metadata
    #[serde(default)]
    pub token_standard: Option<TokenStandard>,
}

/// Cache refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Delay before re-fetching cached views after a batch (milliseconds)
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
}

impl RefreshConfig {
    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }
}

/// Per-action success messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_stake_message")]
    pub stake: NotificationConfig,

    #[serde(default = "default_unstake_message")]
    pub unstake: NotificationConfig,

    /// Used instead of `unstake` when the batch starts a cooldown
    #[serde(default = "default_cooldown_message")]
    pub cooldown: NotificationConfig,

    #[serde(default = "default_claim_message")]
    pub claim: NotificationConfig,
}

/// Display metadata of a known stake pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    /// Short name that can be used instead of the address
    pub name: String,

    /// Pool address (base58)
    pub address: String,

    #[serde(default)]
    pub receipt_kind: Option<ReceiptKind>,

    #[serde(default)]
    pub token_standard: Option<TokenStandard>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_settlement_delay_ms() -> u64 {
    2000
}

fn default_stake_message() -> NotificationConfig {
    NotificationConfig::new(
        "Successfully staked",
        "Stake progress will now dynamically update",
    )
}

fn default_unstake_message() -> NotificationConfig {
    NotificationConfig::new(
        "Successfully unstaked",
        "These tokens are now available in your wallet",
    )
}

fn default_cooldown_message() -> NotificationConfig {
    NotificationConfig::new(
        "Successfully initiated cooldown",
        "These tokens are now available in your wallet",
    )
}

fn default_claim_message() -> NotificationConfig {
    NotificationConfig::new(
        "Successfully claimed rewards",
        "These rewards are now available in your wallet",
    )
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            rpc_url: Environment::Local.default_rpc_url().to_string(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl NetworkConfig {
    /// Tracing filter directive for `log_level`
    pub fn log_filter(&self) -> String {
        self.log_level.trim().to_lowercase()
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            settlement_delay_ms: default_settlement_delay_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            stake: default_stake_message(),
            unstake: default_unstake_message(),
            cooldown: default_cooldown_message(),
            claim: default_claim_message(),
        }
    }
}
