use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use std::fmt;

/// Identity key of a selectable token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKey {
    /// Unstaked tokens are keyed by mint address
    Mint(Pubkey),

    /// Staked tokens are keyed by stake entry address
    StakeEntry(Pubkey),
}

impl TokenKey {
    pub fn address(&self) -> &Pubkey {
        match self {
            TokenKey::Mint(address) | TokenKey::StakeEntry(address) => address,
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// On-ledger record of one active stake
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub address: Pubkey,
    pub pool: Pubkey,
    pub original_mint: Pubkey,
    pub last_staker: Pubkey,

    /// Staked amount in natural units
    pub amount: u64,

    /// Unix timestamp at which the cooldown began, if it has
    pub cooldown_start_seconds: Option<i64>,
}

impl StakeEntry {
    pub fn cooldown_started(&self) -> bool {
        self.cooldown_start_seconds.is_some()
    }

    pub fn is_staked_by(&self, wallet: &Pubkey) -> bool {
        self.last_staker == *wallet
    }
}

/// A token held in the wallet that may be staked
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakedToken {
    pub mint: Pubkey,

    /// Wallet token account holding the mint, when already known
    pub token_account: Option<Pubkey>,

    /// Owned quantity in natural units
    pub owned_amount: u64,

    /// Decimal precision from the token list, when known
    pub decimals: Option<u8>,

    pub name: Option<String>,

    /// Existing stake entry for this mint in the pool
    pub stake_entry: Option<StakeEntry>,
}

impl UnstakedToken {
    pub fn new(mint: Pubkey, owned_amount: u64) -> Self {
        Self {
            mint,
            token_account: None,
            owned_amount,
            decimals: None,
            name: None,
            stake_entry: None,
        }
    }

    pub fn with_token_account(mut self, token_account: Pubkey) -> Self {
        self.token_account = Some(token_account);
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_stake_entry(mut self, stake_entry: StakeEntry) -> Self {
        self.stake_entry = Some(stake_entry);
        self
    }

    /// Holdings of more than one unit are fungible and need an amount
    pub fn is_fungible(&self) -> bool {
        self.owned_amount > 1
    }

    /// Balance already staked for this mint
    pub fn staked_balance(&self) -> u64 {
        self.stake_entry.as_ref().map_or(0, |entry| entry.amount)
    }

    pub fn key(&self) -> TokenKey {
        TokenKey::Mint(self.mint)
    }
}

/// A token currently staked in the pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakedToken {
    pub original_mint: Pubkey,
    pub stake_entry: Option<StakeEntry>,
    pub name: Option<String>,
}

impl StakedToken {
    pub fn new(stake_entry: StakeEntry) -> Self {
        Self {
            original_mint: stake_entry.original_mint,
            stake_entry: Some(stake_entry),
            name: None,
        }
    }

    /// A staked token whose entry could not be loaded
    pub fn without_entry(original_mint: Pubkey) -> Self {
        Self {
            original_mint,
            stake_entry: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key(&self) -> TokenKey {
        match &self.stake_entry {
            Some(entry) => TokenKey::StakeEntry(entry.address),
            None => TokenKey::Mint(self.original_mint),
        }
    }
}

/// Either side of the pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Unstaked(UnstakedToken),
    Staked(StakedToken),
}

impl Token {
    pub fn key(&self) -> TokenKey {
        match self {
            Token::Unstaked(token) => token.key(),
            Token::Staked(token) => token.key(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Unstaked(token) => token.name.as_deref(),
            Token::Staked(token) => token.name.as_deref(),
        }
    }

    /// Name for notifications, falling back to the identity key
    pub fn display_name(&self) -> String {
        self.name()
            .map(str::to_string)
            .unwrap_or_else(|| self.key().to_string())
    }
}

impl From<UnstakedToken> for Token {
    fn from(token: UnstakedToken) -> Self {
        Token::Unstaked(token)
    }
}

impl From<StakedToken> for Token {
    fn from(token: StakedToken) -> Self {
        Token::Staked(token)
    }
}
