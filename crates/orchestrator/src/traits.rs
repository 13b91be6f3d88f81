//! Collaborators consumed by the orchestrator

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use solana_pubkey::Pubkey;
use stakeflow_types::{
    Notification, NotificationConfig, ReceiptKind, TransactionSignature, TransactionStatus,
    UnsignedTransaction,
};

use crate::error::{LedgerError, ProgramError, SigningError, SubmissionError, ViewError};

/// Connected wallet
#[async_trait]
pub trait SigningContext: Send + Sync {
    /// Public address, `None` while disconnected
    fn public_key(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// Sign a transaction (co-signed by `signers`) and send it
    async fn sign_and_send(
        &self,
        transaction: &UnsignedTransaction,
        signers: &[SigningKey],
    ) -> Result<TransactionSignature, SigningError>;
}

/// Read access to on-ledger account state
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Token account holding `mint` for `owner`, if any
    async fn find_token_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Pubkey>, LedgerError>;
}

/// Receipt entry creation transaction
#[derive(Clone, Debug)]
pub struct ReceiptTransaction {
    pub transaction: UnsignedTransaction,
    /// Ephemeral keypair of the receipt mint
    pub stake_mint: Option<SigningKey>,
}

/// Parameters of one stake transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeRequest {
    pub pool: Pubkey,
    pub mint: Pubkey,
    pub token_account: Pubkey,
    /// Natural units; `None` stakes the whole holding
    pub amount: Option<u64>,
    pub receipt_kind: Option<ReceiptKind>,
}

/// Client of the remote staking program
#[async_trait]
pub trait StakingProgramClient: Send + Sync {
    /// Returns `None` when the entry and receipt mint already exist
    async fn build_create_receipt(
        &self,
        connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        pool: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<ReceiptTransaction>, ProgramError>;

    async fn build_stake(
        &self,
        connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        request: &StakeRequest,
    ) -> Result<UnsignedTransaction, ProgramError>;

    async fn build_unstake(
        &self,
        connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<UnsignedTransaction, ProgramError>;

    async fn build_claim(
        &self,
        connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        pool: &Pubkey,
        stake_entry: &Pubkey,
    ) -> Result<UnsignedTransaction, ProgramError>;
}

/// Fire-and-forget user notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Options for one `submit_all` call
#[derive(Clone, Debug, Default)]
pub struct SubmitOptions {
    /// Extra signers, one list per transaction
    pub signers: Vec<Vec<SigningKey>>,
    /// Success notification emitted by the service
    pub notification: Option<NotificationConfig>,
}

/// Signs and sends a list of transactions
///
/// Atomic per call: either one status per transaction, in order, or an error
/// for the whole call. The service notifies the user of its own failures.
#[async_trait]
pub trait SubmissionService: Send + Sync {
    async fn submit_all(
        &self,
        connection: &dyn LedgerConnection,
        signing: &dyn SigningContext,
        transactions: Vec<UnsignedTransaction>,
        options: SubmitOptions,
    ) -> Result<Vec<TransactionStatus>, SubmissionError>;
}

/// Externally cached view of ledger state
#[async_trait]
pub trait CachedView: Send + Sync {
    fn name(&self) -> &str;

    /// Drop the cached value
    async fn invalidate(&self);

    async fn refetch(&self) -> Result<(), ViewError>;
}
