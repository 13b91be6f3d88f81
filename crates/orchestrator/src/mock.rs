//! In-memory collaborators for tests and local development

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use stakeflow_types::{
    IntentKind, Notification, NotificationConfig, NotificationKind, TransactionSignature,
    TransactionStatus, UnsignedTransaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{LedgerError, ProgramError, SigningError, SubmissionError, ViewError};
use crate::traits::{
    CachedView, LedgerConnection, NotificationSink, ReceiptTransaction, SigningContext,
    StakeRequest, StakingProgramClient, SubmissionService, SubmitOptions,
};

/// Program id stamped on mock instructions
pub const MOCK_PROGRAM_ID: Pubkey = Pubkey::new_from_array([7; 32]);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wallet that signs everything it is given
pub struct MockSigner {
    public_key: Option<Pubkey>,
    sent: Mutex<Vec<UnsignedTransaction>>,
    rejected_mints: Mutex<HashSet<Pubkey>>,
}

impl MockSigner {
    pub fn connected(public_key: Pubkey) -> Self {
        Self {
            public_key: Some(public_key),
            sent: Mutex::new(Vec::new()),
            rejected_mints: Mutex::new(HashSet::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            public_key: None,
            sent: Mutex::new(Vec::new()),
            rejected_mints: Mutex::new(HashSet::new()),
        }
    }

    /// Reject transactions built for `mint`
    pub fn reject_for(&self, mint: Pubkey) {
        lock(&self.rejected_mints).insert(mint);
    }

    pub fn sent(&self) -> Vec<UnsignedTransaction> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl SigningContext for MockSigner {
    fn public_key(&self) -> Option<Pubkey> {
        self.public_key
    }

    async fn sign_and_send(
        &self,
        transaction: &UnsignedTransaction,
        _signers: &[SigningKey],
    ) -> Result<TransactionSignature, SigningError> {
        if self.public_key.is_none() {
            return Err(SigningError::NotConnected);
        }
        let rejected = lock(&self.rejected_mints);
        if transaction
            .instructions
            .iter()
            .filter_map(subject)
            .any(|mint| rejected.contains(&mint))
        {
            return Err(SigningError::Rejected);
        }
        drop(rejected);

        let mut sent = lock(&self.sent);
        sent.push(transaction.clone());
        Ok(TransactionSignature::new(format!("sig-{}", sent.len())))
    }
}

/// Ledger with a fixed token account table
#[derive(Default)]
pub struct MockLedger {
    accounts: HashMap<(Pubkey, Pubkey), Pubkey>,
    failing: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read fails
    pub fn failing() -> Self {
        Self {
            accounts: HashMap::new(),
            failing: true,
        }
    }

    pub fn with_account(mut self, owner: Pubkey, mint: Pubkey, account: Pubkey) -> Self {
        self.accounts.insert((owner, mint), account);
        self
    }
}

#[async_trait]
impl LedgerConnection for MockLedger {
    async fn find_token_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Pubkey>, LedgerError> {
        if self.failing {
            return Err(LedgerError::Rpc("connection refused".to_string()));
        }
        Ok(self.accounts.get(&(*owner, *mint)).copied())
    }
}

/// Staking program client producing one tagged instruction per transaction.
///
/// Instruction data is the intent kind tag followed by the mint (or stake
/// entry) the transaction is about.
#[derive(Default)]
pub struct MockProgramClient {
    failing: Mutex<HashSet<Pubkey>>,
    existing_receipts: Mutex<HashSet<Pubkey>>,
    calls: Mutex<Vec<(IntentKind, Pubkey)>>,
    stake_requests: Mutex<Vec<StakeRequest>>,
}

impl MockProgramClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every build for `subject` (mint or stake entry)
    pub fn fail_for(&self, subject: Pubkey) {
        lock(&self.failing).insert(subject);
    }

    /// Report the receipt entry for `mint` as already created
    pub fn receipt_exists(&self, mint: Pubkey) {
        lock(&self.existing_receipts).insert(mint);
    }

    pub fn calls(&self) -> Vec<(IntentKind, Pubkey)> {
        lock(&self.calls).clone()
    }

    pub fn stake_requests(&self) -> Vec<StakeRequest> {
        lock(&self.stake_requests).clone()
    }

    fn transaction(
        &self,
        kind: IntentKind,
        wallet: &Pubkey,
        subject: &Pubkey,
    ) -> Result<UnsignedTransaction, ProgramError> {
        lock(&self.calls).push((kind, *subject));
        if lock(&self.failing).contains(subject) {
            return Err(ProgramError::Build(format!("cannot build {kind} for {subject}")));
        }
        Ok(UnsignedTransaction::new(
            *wallet,
            vec![tagged_instruction(kind, subject)],
        ))
    }
}

#[async_trait]
impl StakingProgramClient for MockProgramClient {
    async fn build_create_receipt(
        &self,
        _connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        _pool: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<ReceiptTransaction>, ProgramError> {
        if lock(&self.existing_receipts).contains(mint) {
            return Ok(None);
        }
        let transaction = self.transaction(IntentKind::CreateReceipt, wallet, mint)?;
        Ok(Some(ReceiptTransaction {
            transaction,
            stake_mint: Some(SigningKey::from_bytes(&mint.to_bytes())),
        }))
    }

    async fn build_stake(
        &self,
        _connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        request: &StakeRequest,
    ) -> Result<UnsignedTransaction, ProgramError> {
        lock(&self.stake_requests).push(request.clone());
        self.transaction(IntentKind::Stake, wallet, &request.mint)
    }

    async fn build_unstake(
        &self,
        _connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        _pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<UnsignedTransaction, ProgramError> {
        self.transaction(IntentKind::Unstake, wallet, original_mint)
    }

    async fn build_claim(
        &self,
        _connection: &dyn LedgerConnection,
        wallet: &Pubkey,
        _pool: &Pubkey,
        stake_entry: &Pubkey,
    ) -> Result<UnsignedTransaction, ProgramError> {
        self.transaction(IntentKind::ClaimRewards, wallet, stake_entry)
    }
}

fn tagged_instruction(kind: IntentKind, subject: &Pubkey) -> Instruction {
    let tag = match kind {
        IntentKind::CreateReceipt => 0u8,
        IntentKind::Stake => 1,
        IntentKind::Unstake => 2,
        IntentKind::ClaimRewards => 3,
    };
    let mut data = Vec::with_capacity(33);
    data.push(tag);
    data.extend_from_slice(subject.as_ref());
    Instruction::new_with_bytes(MOCK_PROGRAM_ID, &data, Vec::new())
}

fn subject(instruction: &Instruction) -> Option<Pubkey> {
    let bytes: [u8; 32] = instruction.data.get(1..33)?.try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

/// One recorded `submit_all` call
#[derive(Clone, Debug)]
pub struct SubmittedWave {
    pub transactions: Vec<UnsignedTransaction>,
    /// Extra signer count per transaction
    pub signer_counts: Vec<usize>,
    pub notification: Option<NotificationConfig>,
}

impl SubmittedWave {
    /// Mints (or stake entries) of the wave's transactions, in order
    pub fn subjects(&self) -> Vec<Pubkey> {
        self.transactions
            .iter()
            .filter_map(|tx| tx.instructions.first().and_then(subject))
            .collect()
    }
}

/// Submission service that sends through the signing context and
/// notifies like a wallet adapter would
pub struct MockSubmissionService {
    sink: Arc<dyn NotificationSink>,
    waves: Mutex<Vec<SubmittedWave>>,
    failing_calls: Mutex<HashSet<usize>>,
    drop_last_status: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
}

impl MockSubmissionService {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            waves: Mutex::new(Vec::new()),
            failing_calls: Mutex::new(HashSet::new()),
            drop_last_status: Mutex::new(false),
            latency: Mutex::new(None),
        }
    }

    /// Fail the `call`-th submission (zero based) as a whole
    pub fn fail_call(&self, call: usize) {
        lock(&self.failing_calls).insert(call);
    }

    /// Report one status fewer than transactions submitted
    pub fn drop_last_status(&self) {
        *lock(&self.drop_last_status) = true;
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn waves(&self) -> Vec<SubmittedWave> {
        lock(&self.waves).clone()
    }
}

#[async_trait]
impl SubmissionService for MockSubmissionService {
    async fn submit_all(
        &self,
        _connection: &dyn LedgerConnection,
        signing: &dyn SigningContext,
        transactions: Vec<UnsignedTransaction>,
        options: SubmitOptions,
    ) -> Result<Vec<TransactionStatus>, SubmissionError> {
        let call = {
            let mut waves = lock(&self.waves);
            waves.push(SubmittedWave {
                transactions: transactions.clone(),
                signer_counts: options.signers.iter().map(Vec::len).collect(),
                notification: options.notification.clone(),
            });
            waves.len() - 1
        };

        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if lock(&self.failing_calls).contains(&call) {
            self.sink
                .notify(Notification::error("Failed to send transactions"));
            return Err(SubmissionError::Rejected("blockhash not found".to_string()));
        }

        let mut statuses = Vec::with_capacity(transactions.len());
        for (idx, transaction) in transactions.iter().enumerate() {
            let signers = options.signers.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            statuses.push(match signing.sign_and_send(transaction, signers).await {
                Ok(signature) => TransactionStatus::Submitted(signature),
                Err(e) => TransactionStatus::Failed(e.to_string()),
            });
        }

        if statuses.iter().any(TransactionStatus::is_submitted) {
            if let Some(config) = &options.notification {
                self.sink.notify(config.to_notification());
            }
        }

        if *lock(&self.drop_last_status) {
            statuses.pop();
        }
        Ok(statuses)
    }
}

/// Sink that keeps every notification
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.of_kind(kind).len()
    }

    pub fn clear(&self) {
        lock(&self.notifications).clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

/// Cached view counting invalidations and re-fetches
pub struct MockView {
    name: String,
    failing: bool,
    invalidations: AtomicUsize,
    refetches: AtomicUsize,
}

impl MockView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failing: false,
            invalidations: AtomicUsize::new(0),
            refetches: AtomicUsize::new(0),
        }
    }

    /// Every re-fetch fails
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            failing: true,
            ..Self::new(name)
        }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn refetches(&self) -> usize {
        self.refetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CachedView for MockView {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn refetch(&self) -> Result<(), ViewError> {
        self.refetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ViewError::Refetch {
                view: self.name.clone(),
                reason: "rpc timeout".to_string(),
            });
        }
        Ok(())
    }
}
