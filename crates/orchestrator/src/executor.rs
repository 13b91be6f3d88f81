use stakeflow_types::{
    BatchOutcome, IntentKind, IntentResult, NotificationConfig, PreparedIntent, TokenKey,
    TransactionStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{SubmissionError, SubmissionFailure, Wave};
use crate::traits::{LedgerConnection, SigningContext, SubmissionService, SubmitOptions};

/// Reason recorded for a stake whose receipt entry failed
pub const RECEIPT_NOT_CREATED: &str = "receipt entry was not created";

/// Submits built intents in waves.
///
/// `CreateReceipt` intents go out first, without a success notification; the
/// remaining intents follow as one wave in selection order.
pub struct BatchExecutor {
    service: Arc<dyn SubmissionService>,
    connection: Arc<dyn LedgerConnection>,
}

impl BatchExecutor {
    pub fn new(service: Arc<dyn SubmissionService>, connection: Arc<dyn LedgerConnection>) -> Self {
        Self {
            service,
            connection,
        }
    }

    pub async fn submit(
        &self,
        intents: Vec<PreparedIntent>,
        signing: &dyn SigningContext,
        notification: NotificationConfig,
    ) -> Result<BatchOutcome, SubmissionFailure> {
        // Results are slotted by intent index so the outcome follows selection order
        let mut results: Vec<Option<IntentResult>> = vec![None; intents.len()];
        let (receipts, main): (Vec<_>, Vec<_>) = intents
            .into_iter()
            .enumerate()
            .partition(|(_, intent)| intent.kind() == IntentKind::CreateReceipt);

        let mut missing_receipts: HashSet<TokenKey> = HashSet::new();

        if !receipts.is_empty() {
            info!(wave = %Wave::Receipt, transactions = receipts.len(), "submitting wave");
            let statuses = match self.submit_wave(&receipts, signing, None).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    warn!(wave = %Wave::Receipt, error = %e, "wave submission failed");
                    vec![TransactionStatus::Failed(e.to_string()); receipts.len()]
                }
            };
            for ((index, intent), status) in receipts.iter().zip(statuses) {
                if !status.is_submitted() {
                    missing_receipts.insert(intent.token);
                }
                results[*index] = Some(IntentResult::new(intent.token, intent.kind(), status));
            }
        }

        let (blocked, ready): (Vec<_>, Vec<_>) = main.into_iter().partition(|(_, intent)| {
            intent.kind() == IntentKind::Stake && missing_receipts.contains(&intent.token)
        });
        for (index, intent) in &blocked {
            results[*index] = Some(IntentResult::new(
                intent.token,
                intent.kind(),
                TransactionStatus::Failed(RECEIPT_NOT_CREATED.to_string()),
            ));
        }

        if ready.is_empty() {
            return Ok(collect(results));
        }

        info!(wave = %Wave::Main, transactions = ready.len(), "submitting wave");
        match self.submit_wave(&ready, signing, Some(notification)).await {
            Ok(statuses) => {
                for ((index, intent), status) in ready.iter().zip(statuses) {
                    results[*index] = Some(IntentResult::new(intent.token, intent.kind(), status));
                }
                let outcome = collect(results);
                info!(
                    submitted = outcome.submitted_count(),
                    failed = outcome.failed_count(),
                    summary = %outcome.summary(),
                    "batch submitted"
                );
                Ok(outcome)
            }
            Err(source) => {
                warn!(wave = %Wave::Main, error = %source, "wave submission failed");
                Err(SubmissionFailure {
                    wave: Wave::Main,
                    source,
                    partial: collect(results),
                })
            }
        }
    }

    async fn submit_wave(
        &self,
        intents: &[(usize, PreparedIntent)],
        signing: &dyn SigningContext,
        notification: Option<NotificationConfig>,
    ) -> Result<Vec<TransactionStatus>, SubmissionError> {
        let transactions = intents.iter().map(|(_, i)| i.transaction.clone()).collect();
        let options = SubmitOptions {
            signers: intents.iter().map(|(_, i)| i.signers.clone()).collect(),
            notification,
        };

        let statuses = self
            .service
            .submit_all(self.connection.as_ref(), signing, transactions, options)
            .await?;

        if statuses.len() != intents.len() {
            return Err(SubmissionError::ResultCountMismatch {
                expected: intents.len(),
                actual: statuses.len(),
            });
        }
        Ok(statuses)
    }
}

fn collect(results: Vec<Option<IntentResult>>) -> BatchOutcome {
    let mut outcome = BatchOutcome::new();
    for result in results.into_iter().flatten() {
        outcome.push(result);
    }
    outcome
}
