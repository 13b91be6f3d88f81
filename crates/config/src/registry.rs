//! Stake pool resolution

use solana_pubkey::Pubkey;
use stakeflow_types::{ReceiptKind, TokenStandard};
use std::str::FromStr;
use tracing::debug;

use crate::{AppConfig, PoolMetadata};

/// A pool identifier resolved to an address plus whatever metadata is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPool {
    pub address: Pubkey,
    pub name: Option<String>,
    pub receipt_kind: Option<ReceiptKind>,
    pub token_standard: Option<TokenStandard>,
}

/// Lookup table of known stake pools
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Vec<PoolMetadata>,
}

impl PoolRegistry {
    pub fn new(pools: Vec<PoolMetadata>) -> Self {
        Self { pools }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.pools.clone())
    }

    /// Resolve a pool by metadata name, then metadata address, then as a raw address.
    pub fn resolve(&self, identifier: &str) -> Option<ResolvedPool> {
        let identifier = identifier.trim();

        let by_name = self.pools.iter().find(|p| p.name == identifier);
        let by_address = || self.pools.iter().find(|p| p.address == identifier);

        if let Some(metadata) = by_name.or_else(by_address) {
            return match Pubkey::from_str(&metadata.address) {
                Ok(address) => Some(ResolvedPool {
                    address,
                    name: Some(metadata.name.clone()),
                    receipt_kind: metadata.receipt_kind,
                    token_standard: metadata.token_standard,
                }),
                Err(e) => {
                    debug!(pool = %metadata.name, error = %e, "pool metadata has an invalid address");
                    None
                }
            };
        }

        Pubkey::from_str(identifier).ok().map(|address| ResolvedPool {
            address,
            name: None,
            receipt_kind: None,
            token_standard: None,
        })
    }

    pub fn pools(&self) -> &[PoolMetadata] {
        &self.pools
    }
}

impl AppConfig {
    /// Resolve the configured pool, applying the `[pool]` overrides
    pub fn resolve_pool(&self) -> Option<ResolvedPool> {
        let mut resolved = PoolRegistry::from_config(self).resolve(&self.pool.stake_pool)?;
        if self.pool.receipt_kind.is_some() {
            resolved.receipt_kind = self.pool.receipt_kind;
        }
        if self.pool.token_standard.is_some() {
            resolved.token_standard = self.pool.token_standard;
        }
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(seed: u8) -> String {
        Pubkey::new_from_array([seed; 32]).to_string()
    }

    fn registry() -> PoolRegistry {
        PoolRegistry::new(vec![
            PoolMetadata {
                name: "degens".to_string(),
                address: address(1),
                receipt_kind: Some(ReceiptKind::Receipt),
                token_standard: Some(TokenStandard::NonFungible),
            },
            PoolMetadata {
                name: "broken".to_string(),
                address: "not-an-address".to_string(),
                receipt_kind: None,
                token_standard: None,
            },
        ])
    }

    #[test]
    fn test_resolve_by_name() {
        let resolved = registry().resolve("degens").unwrap();
        assert_eq!(resolved.address, Pubkey::new_from_array([1; 32]));
        assert_eq!(resolved.name.as_deref(), Some("degens"));
        assert_eq!(resolved.receipt_kind, Some(ReceiptKind::Receipt));
    }

    #[test]
    fn test_resolve_by_metadata_address() {
        let resolved = registry().resolve(&address(1)).unwrap();
        assert_eq!(resolved.name.as_deref(), Some("degens"));
    }

    #[test]
    fn test_resolve_raw_address() {
        let resolved = registry().resolve(&address(2)).unwrap();
        assert_eq!(resolved.address, Pubkey::new_from_array([2; 32]));
        assert!(resolved.name.is_none());
        assert!(resolved.receipt_kind.is_none());
    }

    #[test]
    fn test_unknown_name_does_not_resolve() {
        assert!(registry().resolve("unknown-pool").is_none());
        assert!(registry().resolve("broken").is_none());
    }

    #[test]
    fn test_app_config_overrides_metadata() {
        let mut config = AppConfig::default();
        config.pools = registry().pools().to_vec();
        config.pool.stake_pool = "degens".to_string();
        config.pool.receipt_kind = Some(ReceiptKind::Original);

        let resolved = config.resolve_pool().unwrap();
        assert_eq!(resolved.receipt_kind, Some(ReceiptKind::Original));
        assert_eq!(resolved.token_standard, Some(TokenStandard::NonFungible));
    }
}
