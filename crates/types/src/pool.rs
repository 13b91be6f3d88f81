use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use crate::UnstakedToken;

/// What staking does with the original token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptKind {
    /// The original token is locked in place
    #[default]
    Original,

    /// A derived receipt token is minted to the staker
    Receipt,
}

/// Which holdings a pool accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStandard {
    Fungible,
    NonFungible,
}

impl TokenStandard {
    pub fn admits(&self, token: &UnstakedToken) -> bool {
        match self {
            TokenStandard::Fungible => token.is_fungible(),
            TokenStandard::NonFungible => !token.is_fungible(),
        }
    }
}

/// Staking rules of a pool, read from the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub address: Pubkey,

    /// Cooldown applied after unstaking (seconds)
    pub cooldown_seconds: Option<u32>,

    /// Minimum time a token must stay staked (seconds)
    pub min_stake_seconds: Option<u32>,

    pub receipt_kind: ReceiptKind,
}

impl PoolConfig {
    pub fn new(address: Pubkey) -> Self {
        Self {
            address,
            cooldown_seconds: None,
            min_stake_seconds: None,
            receipt_kind: ReceiptKind::Original,
        }
    }

    pub fn with_cooldown(mut self, seconds: u32) -> Self {
        self.cooldown_seconds = Some(seconds);
        self
    }

    pub fn with_min_stake(mut self, seconds: u32) -> Self {
        self.min_stake_seconds = Some(seconds);
        self
    }

    pub fn with_receipt_kind(mut self, receipt_kind: ReceiptKind) -> Self {
        self.receipt_kind = receipt_kind;
        self
    }

    pub fn enforces_cooldown(&self) -> bool {
        self.cooldown_seconds.is_some_and(|seconds| seconds > 0)
    }

    pub fn has_min_stake_duration(&self) -> bool {
        self.min_stake_seconds.is_some_and(|seconds| seconds > 0)
    }
}
