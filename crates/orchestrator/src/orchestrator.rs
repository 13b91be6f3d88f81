use solana_pubkey::Pubkey;
use stakeflow_config::{AppConfig, NotificationsConfig};
use stakeflow_metrics::{ActionSpan, MetricsCollector};
use stakeflow_types::{
    ActionKind, ActionScope, BatchOutcome, BatchSummary, Notification, NotificationConfig,
    PoolConfig, ReceiptKind, StakedToken, Token, TokenKey, TokenStandard, UnstakedToken,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::builder::{BuildContext, IntentBuilder};
use crate::error::{BuildError, OrchestratorError, SelectionError, ValidationError};
use crate::executor::BatchExecutor;
use crate::refresh::{CachedViews, RefreshScheduler, DEFAULT_SETTLEMENT_DELAY};
use crate::selection::{SelectionStore, ToggleOutcome};
use crate::traits::{
    LedgerConnection, NotificationSink, SigningContext, StakingProgramClient, SubmissionService,
};

/// Phase of the action currently in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Validating,
    BuildingIntents,
    Submitting,
    Settling,
}

impl OrchestratorState {
    pub fn is_busy(&self) -> bool {
        *self != OrchestratorState::Idle
    }
}

/// Success notification per action
#[derive(Clone, Debug)]
pub struct SuccessMessages {
    pub stake: NotificationConfig,
    pub unstake: NotificationConfig,
    /// Replaces `unstake` when the batch starts a cooldown
    pub cooldown: NotificationConfig,
    pub claim: NotificationConfig,
}

impl SuccessMessages {
    pub fn for_action(&self, action: ActionKind, cooldown_initiated: bool) -> NotificationConfig {
        match action {
            ActionKind::Stake => self.stake.clone(),
            ActionKind::Unstake if cooldown_initiated => self.cooldown.clone(),
            ActionKind::Unstake => self.unstake.clone(),
            ActionKind::ClaimRewards => self.claim.clone(),
        }
    }
}

impl From<&NotificationsConfig> for SuccessMessages {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            stake: config.stake.clone(),
            unstake: config.unstake.clone(),
            cooldown: config.cooldown.clone(),
            claim: config.claim.clone(),
        }
    }
}

impl Default for SuccessMessages {
    fn default() -> Self {
        Self::from(&NotificationsConfig::default())
    }
}

/// Configuration for the orchestrator
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Delay before cached views are re-fetched
    pub settlement_delay: Duration,

    /// Default receipt kind; falls back to the pool's own
    pub receipt_kind: Option<ReceiptKind>,

    /// Restricts which unstaked holdings can be selected
    pub token_standard: Option<TokenStandard>,

    pub messages: SuccessMessages,
}

impl OrchestratorConfig {
    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = delay;
        self
    }

    pub fn with_receipt_kind(mut self, receipt_kind: ReceiptKind) -> Self {
        self.receipt_kind = Some(receipt_kind);
        self
    }

    pub fn with_token_standard(mut self, token_standard: TokenStandard) -> Self {
        self.token_standard = Some(token_standard);
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settlement_delay: DEFAULT_SETTLEMENT_DELAY,
            receipt_kind: None,
            token_standard: None,
            messages: SuccessMessages::default(),
        }
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        let pool = config.resolve_pool();
        Self {
            settlement_delay: config.refresh.settlement_delay(),
            receipt_kind: pool.as_ref().and_then(|p| p.receipt_kind),
            token_standard: pool.as_ref().and_then(|p| p.token_standard),
            messages: SuccessMessages::from(&config.notifications),
        }
    }
}

/// What one action did
#[derive(Debug)]
pub struct ActionReport {
    pub action: ActionKind,
    /// Tokens handed to the intent builder
    pub considered: usize,
    /// Intents built, receipt intents included
    pub built: usize,
    pub failures: Vec<(TokenKey, BuildError)>,
    pub cooldown_initiated: bool,
    /// `None` when nothing was submitted
    pub outcome: Option<BatchOutcome>,
}

impl ActionReport {
    pub fn summary(&self) -> BatchSummary {
        self.outcome
            .as_ref()
            .map_or(BatchSummary::Empty, BatchOutcome::summary)
    }
}

/// Builder error
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Builder for StakingOrchestrator
#[derive(Default)]
pub struct StakingOrchestratorBuilder {
    signing: Option<Arc<dyn SigningContext>>,
    connection: Option<Arc<dyn LedgerConnection>>,
    program: Option<Arc<dyn StakingProgramClient>>,
    submission: Option<Arc<dyn SubmissionService>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    views: Option<CachedViews>,
    metrics: Option<Arc<MetricsCollector>>,
    pool: Option<PoolConfig>,
    config: OrchestratorConfig,
}

impl StakingOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connected wallet
    pub fn with_signing(mut self, signing: Arc<dyn SigningContext>) -> Self {
        self.signing = Some(signing);
        self
    }

    /// Set the ledger connection
    pub fn with_connection(mut self, connection: Arc<dyn LedgerConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Set the staking program client
    pub fn with_program(mut self, program: Arc<dyn StakingProgramClient>) -> Self {
        self.program = Some(program);
        self
    }

    /// Set the submission service
    pub fn with_submission(mut self, submission: Arc<dyn SubmissionService>) -> Self {
        self.submission = Some(submission);
        self
    }

    /// Set the notification sink
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the cached views refreshed after each batch
    pub fn with_views(mut self, views: CachedViews) -> Self {
        self.views = Some(views);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the pool, if it is already loaded
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply an application config. Metrics are collected unless
    /// `network.metrics_enabled` is off.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        debug!(
            environment = ?config.network.environment,
            rpc_url = %config.network.rpc_url,
            metrics_enabled = config.network.metrics_enabled,
            "applying app config"
        );
        self.config = OrchestratorConfig::from(config);
        self.metrics = config
            .network
            .metrics_enabled
            .then(|| Arc::new(MetricsCollector::new()));
        self
    }

    /// Build the StakingOrchestrator, validating that all required fields are set
    pub fn build(self) -> Result<StakingOrchestrator, BuilderError> {
        let signing = self.signing.ok_or_else(|| missing("signing"))?;
        let connection = self.connection.ok_or_else(|| missing("connection"))?;
        let program = self.program.ok_or_else(|| missing("program"))?;
        let submission = self.submission.ok_or_else(|| missing("submission"))?;
        let notifier = self.notifier.ok_or_else(|| missing("notifier"))?;
        let views = self.views.ok_or_else(|| missing("views"))?;

        let (state, _) = watch::channel(OrchestratorState::Idle);

        let core = OrchestratorCore {
            signing,
            pool: RwLock::new(self.pool),
            receipt_kind: RwLock::new(None),
            selection: Mutex::new(SelectionStore::new()),
            builder: IntentBuilder::new(program, connection.clone(), notifier.clone()),
            executor: BatchExecutor::new(submission, connection),
            refresh: RefreshScheduler::new(views, self.config.settlement_delay),
            notifier,
            metrics: self.metrics,
            config: self.config,
            state,
            last_refresh: Mutex::new(None),
        };
        Ok(StakingOrchestrator {
            core: Arc::new(core),
        })
    }
}

fn missing(field: &str) -> BuilderError {
    BuilderError::MissingField {
        field: field.to_string(),
    }
}

/// Coordinates stake, unstake and claim actions over the current selection.
///
/// Each action moves through `Validating`, `BuildingIntents`, `Submitting`
/// and `Settling` before returning to `Idle`; the selection is frozen for
/// the whole span and cleared once the action settles. Actions run on their
/// own task, so dropping the returned future does not abandon an action
/// midway.
pub struct StakingOrchestrator {
    core: Arc<OrchestratorCore>,
}

struct OrchestratorCore {
    signing: Arc<dyn SigningContext>,
    pool: RwLock<Option<PoolConfig>>,
    /// User choice, overrides the configured and pool default
    receipt_kind: RwLock<Option<ReceiptKind>>,
    selection: Mutex<SelectionStore>,
    builder: IntentBuilder,
    executor: BatchExecutor,
    refresh: RefreshScheduler,
    notifier: Arc<dyn NotificationSink>,
    metrics: Option<Arc<MetricsCollector>>,
    config: OrchestratorConfig,
    state: watch::Sender<OrchestratorState>,
    last_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl StakingOrchestrator {
    pub fn builder() -> StakingOrchestratorBuilder {
        StakingOrchestratorBuilder::new()
    }

    pub async fn set_pool(&self, pool: Option<PoolConfig>) {
        *self.core.pool.write().await = pool;
    }

    pub async fn set_receipt_kind(&self, receipt_kind: ReceiptKind) {
        *self.core.receipt_kind.write().await = Some(receipt_kind);
    }

    /// Receipt kind used for the next stake
    pub async fn receipt_kind(&self) -> ReceiptKind {
        self.core.receipt_kind().await
    }

    /// Toggle an unstaked token; an invalid amount is reported to the user
    pub async fn toggle_unstaked(
        &self,
        token: &UnstakedToken,
        amount: Option<&str>,
    ) -> Result<ToggleOutcome, SelectionError> {
        if let Some(standard) = self.core.config.token_standard {
            if !standard.admits(token) {
                debug!(token = %token.key(), ?standard, "token standard not accepted by pool");
                return Ok(ToggleOutcome::Ignored);
            }
        }

        let result = self.core.selection.lock().await.toggle_unstaked(token, amount);
        if let Err(e) = &result {
            self.core.notifier.notify(Notification::error(e.to_string()));
        }
        result
    }

    pub async fn toggle_staked(&self, token: &StakedToken) -> ToggleOutcome {
        let wallet = self.core.signing.public_key();
        self.core
            .selection
            .lock()
            .await
            .toggle_staked(token, wallet.as_ref())
    }

    pub async fn is_selected(&self, key: &TokenKey) -> bool {
        self.core.selection.lock().await.is_selected(key)
    }

    /// Number of selected tokens across both selections
    pub async fn selection_len(&self) -> usize {
        self.core.selection.lock().await.len()
    }

    pub fn state(&self) -> OrchestratorState {
        *self.core.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.core.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Collector recording this orchestrator's actions, if metrics are enabled
    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.core.metrics.as_deref()
    }

    /// Stake the selected tokens, or every token of `all_tokens`
    pub async fn stake(
        &self,
        scope: ActionScope,
        all_tokens: &[UnstakedToken],
    ) -> Result<ActionReport, OrchestratorError> {
        let standard = self.core.config.token_standard;
        let source = all_tokens
            .iter()
            .filter(|token| standard.map_or(true, |s| s.admits(token)))
            .cloned()
            .map(Token::from)
            .collect();
        self.run(ActionKind::Stake, scope, source).await
    }

    /// Unstake the selected tokens, or every token of `all_tokens`
    pub async fn unstake(
        &self,
        scope: ActionScope,
        all_tokens: &[StakedToken],
    ) -> Result<ActionReport, OrchestratorError> {
        let source = all_tokens.iter().cloned().map(Token::from).collect();
        self.run(ActionKind::Unstake, scope, source).await
    }

    /// Claim rewards for the selected tokens, or every token of `all_tokens`
    pub async fn claim_rewards(
        &self,
        scope: ActionScope,
        all_tokens: &[StakedToken],
    ) -> Result<ActionReport, OrchestratorError> {
        let source = all_tokens.iter().cloned().map(Token::from).collect();
        self.run(ActionKind::ClaimRewards, scope, source).await
    }

    /// Wait for the delayed re-fetch scheduled by the last action
    pub async fn wait_for_refresh(&self) {
        let handle = self.core.last_refresh.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh task failed");
            }
        }
    }

    async fn run(
        &self,
        action: ActionKind,
        scope: ActionScope,
        source: Vec<Token>,
    ) -> Result<ActionReport, OrchestratorError> {
        let started = self.core.state.send_if_modified(|state| {
            if *state == OrchestratorState::Idle {
                *state = OrchestratorState::Validating;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(OrchestratorError::Busy {
                state: self.state(),
            });
        }

        let core = self.core.clone();
        let span = ActionSpan::new(action);
        let task = tokio::spawn(
            async move { core.run(action, scope, source).await }.instrument(span.span()),
        );

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(action = %action, error = %e, "action task aborted");
                self.core.selection.lock().await.thaw();
                self.core.state.send_replace(OrchestratorState::Idle);
                Err(OrchestratorError::Aborted {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl OrchestratorCore {
    async fn receipt_kind(&self) -> ReceiptKind {
        if let Some(kind) = *self.receipt_kind.read().await {
            return kind;
        }
        if let Some(kind) = self.config.receipt_kind {
            return kind;
        }
        self.pool
            .read()
            .await
            .as_ref()
            .map(|pool| pool.receipt_kind)
            .unwrap_or_default()
    }

    async fn run(
        &self,
        action: ActionKind,
        scope: ActionScope,
        source: Vec<Token>,
    ) -> Result<ActionReport, OrchestratorError> {
        let started_at = Instant::now();
        let result = self.execute(action, scope, source).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_action_duration(action, started_at.elapsed());
        }
        self.state.send_replace(OrchestratorState::Idle);
        result
    }
    async fn execute(
        &self,
        action: ActionKind,
        scope: ActionScope,
        source: Vec<Token>,
    ) -> Result<ActionReport, OrchestratorError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_action_started(action);
        }

        let (tokens, amounts) = {
            let mut selection = self.selection.lock().await;
            selection.freeze();
            let tokens = match (scope, action) {
                (ActionScope::All, _) => source,
                (ActionScope::Selected, ActionKind::Stake) => selection
                    .unstaked()
                    .iter()
                    .cloned()
                    .map(Token::from)
                    .collect(),
                (ActionScope::Selected, ActionKind::Unstake | ActionKind::ClaimRewards) => {
                    selection.staked().iter().cloned().map(Token::from).collect()
                }
            };
            (tokens, selection.amounts().clone())
        };

        let (wallet, pool) = match self.validate(&tokens).await {
            Ok(validated) => validated,
            Err(e) => {
                warn!(action = %action, error = %e, "action rejected");
                self.notifier.notify(Notification::error(e.to_string()));
                if let Some(metrics) = &self.metrics {
                    metrics.record_validation_failure(action);
                }
                self.selection.lock().await.thaw();
                return Err(e.into());
            }
        };

        info!(action = %action, ?scope, tokens = tokens.len(), "action started");
        self.state.send_replace(OrchestratorState::BuildingIntents);

        let ctx = BuildContext {
            pool: &pool,
            wallet,
            receipt_kind: self.receipt_kind().await,
        };
        let output = self.builder.build(action, &ctx, &tokens, &amounts).await;

        if let Some(metrics) = &self.metrics {
            for intent in &output.intents {
                metrics.record_intent_built(intent.kind());
            }
            for (_, e) in &output.failures {
                metrics.record_build_failure(action, e.reason());
            }
        }

        let built = output.intents.len();
        let submission = if output.intents.is_empty() {
            debug!(action = %action, "nothing to submit");
            None
        } else {
            self.state.send_replace(OrchestratorState::Submitting);
            let message = self
                .config
                .messages
                .for_action(action, output.cooldown_initiated);
            Some(
                self.executor
                    .submit(output.intents, self.signing.as_ref(), message)
                    .await,
            )
        };

        self.state.send_replace(OrchestratorState::Settling);
        let refresh = self.refresh.settle().await;
        *self.last_refresh.lock().await = Some(refresh);
        if let Some(metrics) = &self.metrics {
            metrics.record_refresh_scheduled();
        }
        {
            let mut selection = self.selection.lock().await;
            selection.clear();
            selection.thaw();
        }

        let mut report = ActionReport {
            action,
            considered: tokens.len(),
            built,
            failures: output.failures,
            cooldown_initiated: output.cooldown_initiated,
            outcome: None,
        };

        match submission {
            None => Ok(report),
            Some(Ok(outcome)) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch_outcome(action, outcome.summary());
                }
                info!(action = %action, summary = %outcome.summary(), "action settled");
                report.outcome = Some(outcome);
                Ok(report)
            }
            Some(Err(failure)) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_submission_failure(action);
                }
                warn!(action = %action, error = %failure, "action settled after submission failure");
                Err(failure.into())
            }
        }
    }

    async fn validate(
        &self,
        tokens: &[Token],
    ) -> Result<(Pubkey, PoolConfig), ValidationError> {
        let wallet = self
            .signing
            .public_key()
            .filter(|_| self.signing.is_connected())
            .ok_or(ValidationError::WalletNotConnected)?;
        let pool = self
            .pool
            .read()
            .await
            .clone()
            .ok_or(ValidationError::NoStakePool)?;
        if tokens.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok((wallet, pool))
    }
}
