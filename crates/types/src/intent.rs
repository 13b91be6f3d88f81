use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use std::fmt;

use crate::{ReceiptKind, TokenKey};

/// An unsigned, not yet submitted description of one ledger operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationIntent {
    /// Create the stake entry and receipt mint ahead of a receipt stake
    CreateReceipt { pool: Pubkey, mint: Pubkey },

    Stake {
        pool: Pubkey,
        mint: Pubkey,
        token_account: Pubkey,
        /// Natural units; absent for non-fungible tokens
        amount: Option<u64>,
        receipt_kind: Option<ReceiptKind>,
    },

    Unstake {
        pool: Pubkey,
        mint: Pubkey,
        stake_entry: Pubkey,
    },

    ClaimRewards { pool: Pubkey, stake_entry: Pubkey },
}

impl OperationIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            OperationIntent::CreateReceipt { .. } => IntentKind::CreateReceipt,
            OperationIntent::Stake { .. } => IntentKind::Stake,
            OperationIntent::Unstake { .. } => IntentKind::Unstake,
            OperationIntent::ClaimRewards { .. } => IntentKind::ClaimRewards,
        }
    }

    pub fn pool(&self) -> &Pubkey {
        match self {
            OperationIntent::CreateReceipt { pool, .. }
            | OperationIntent::Stake { pool, .. }
            | OperationIntent::Unstake { pool, .. }
            | OperationIntent::ClaimRewards { pool, .. } => pool,
        }
    }

    pub fn amount(&self) -> Option<u64> {
        match self {
            OperationIntent::Stake { amount, .. } => *amount,
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    CreateReceipt,
    Stake,
    Unstake,
    ClaimRewards,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::CreateReceipt => "create_receipt",
            IntentKind::Stake => "stake",
            IntentKind::Unstake => "unstake",
            IntentKind::ClaimRewards => "claim_rewards",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction produced by the staking program client, not yet signed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
}

impl UnsignedTransaction {
    pub fn new(fee_payer: Pubkey, instructions: Vec<Instruction>) -> Self {
        Self {
            fee_payer,
            instructions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// An intent paired with the transaction that carries it out
#[derive(Clone, Debug)]
pub struct PreparedIntent {
    /// Selection key of the token the intent was built for
    pub token: TokenKey,
    pub intent: OperationIntent,
    pub transaction: UnsignedTransaction,
    /// Ephemeral keys that must co-sign the transaction
    pub signers: Vec<SigningKey>,
}

impl PreparedIntent {
    pub fn new(token: TokenKey, intent: OperationIntent, transaction: UnsignedTransaction) -> Self {
        Self {
            token,
            intent,
            transaction,
            signers: Vec::new(),
        }
    }

    pub fn with_signer(mut self, signer: SigningKey) -> Self {
        self.signers.push(signer);
        self
    }

    pub fn kind(&self) -> IntentKind {
        self.intent.kind()
    }
}

/// Base58 transaction signature reported by the submission service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionSignature(String);

impl TransactionSignature {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
