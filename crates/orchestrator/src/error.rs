use solana_pubkey::Pubkey;
use stakeflow_types::{ActionKind, BatchOutcome, TokenKey};
use std::fmt;
use thiserror::Error;

use crate::orchestrator::OrchestratorState;

/// Action preconditions; surfaced once, before any intent is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("No stake pool detected")]
    NoStakePool,

    #[error("No tokens selected")]
    EmptySelection,
}

/// Per-token failure while building intents
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("token account not set for mint {mint}")]
    MissingAccount { mint: Pubkey },

    #[error("no stake entry for token {token}")]
    MissingStakeEntry { token: TokenKey },

    #[error("invalid amount chosen for token {token}: {reason}")]
    InvalidAmount { token: TokenKey, reason: String },

    #[error(
        "fungible tokens already staked in the pool; staked tokens need to be unstaked and then restaked together with the new tokens"
    )]
    AlreadyStaked { mint: Pubkey },

    #[error("token {token} cannot be used for {action}")]
    UnsupportedToken { token: TokenKey, action: ActionKind },

    #[error("ledger read failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("staking program error: {0}")]
    Program(#[from] ProgramError),
}

impl BuildError {
    /// Stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            BuildError::MissingAccount { .. } => "missing_account",
            BuildError::MissingStakeEntry { .. } => "missing_stake_entry",
            BuildError::InvalidAmount { .. } => "invalid_amount",
            BuildError::AlreadyStaked { .. } => "already_staked",
            BuildError::UnsupportedToken { .. } => "unsupported_token",
            BuildError::Ledger(_) => "ledger",
            BuildError::Program(_) => "program",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please enter a valid amount")]
    InvalidAmount { token: TokenKey, amount: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("account {0} could not be decoded")]
    InvalidAccount(Pubkey),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("failed to build instruction: {0}")]
    Build(String),

    #[error("pool {0} not found")]
    PoolNotFound(Pubkey),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("user rejected the request")]
    Rejected,

    #[error("wallet not connected")]
    NotConnected,

    #[error("signing failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("expected {expected} transaction statuses, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("refetch of {view} failed: {reason}")]
    Refetch { view: String, reason: String },
}

/// Submission wave within one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wave {
    /// Stake entry and receipt mint creation
    Receipt,
    Main,
}

impl fmt::Display for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wave::Receipt => f.write_str("receipt"),
            Wave::Main => f.write_str("main"),
        }
    }
}

/// A submission call that failed as a whole
#[derive(Debug, Error)]
#[error("{wave} wave submission failed: {source}")]
pub struct SubmissionFailure {
    pub wave: Wave,
    #[source]
    pub source: SubmissionError,
    /// Results recorded before the failing wave
    pub partial: BatchOutcome,
}

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("another action is in flight ({state:?})")]
    Busy { state: OrchestratorState },

    #[error(transparent)]
    Submission(#[from] SubmissionFailure),

    #[error("action task aborted: {reason}")]
    Aborted { reason: String },
}
