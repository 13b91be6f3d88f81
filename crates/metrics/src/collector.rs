use std::time::Duration;

use prometheus::{Encoder, TextEncoder};
use stakeflow_types::{ActionKind, BatchSummary, IntentKind};

use crate::metrics::*;

/// Records orchestrator activity into the process-wide Prometheus registry
#[derive(Debug, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_action_started(&self, action: ActionKind) {
        ACTIONS_TOTAL.with_label_values(&[action.as_str()]).inc();
    }

    pub fn record_validation_failure(&self, action: ActionKind) {
        ACTION_VALIDATION_FAILURES
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn record_action_duration(&self, action: ActionKind, duration: Duration) {
        ACTION_DURATION
            .with_label_values(&[action.as_str()])
            .observe(duration.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_intent_built(&self, kind: IntentKind) {
        INTENTS_BUILT.with_label_values(&[kind.as_str()]).inc();
    }

    /// `reason` is a short stable label such as `missing_account`
    pub fn record_build_failure(&self, action: ActionKind, reason: &str) {
        INTENT_BUILD_FAILURES
            .with_label_values(&[action.as_str(), reason])
            .inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_batch_outcome(&self, action: ActionKind, summary: BatchSummary) {
        BATCH_OUTCOMES
            .with_label_values(&[action.as_str(), summary.as_str()])
            .inc();
    }

    pub fn record_submission_failure(&self, action: ActionKind) {
        SUBMISSION_FAILURES
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn record_refresh_scheduled(&self) {
        REFRESHES_SCHEDULED.inc();
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("metrics output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_counters() {
        let collector = MetricsCollector::new();
        let before = ACTIONS_TOTAL.with_label_values(&["claim_rewards"]).get();

        collector.record_action_started(ActionKind::ClaimRewards);
        collector.record_action_started(ActionKind::ClaimRewards);

        let after = ACTIONS_TOTAL.with_label_values(&["claim_rewards"]).get();
        assert_eq!(after - before, 2);
    }

    #[test]
    fn test_build_failure_labels() {
        let collector = MetricsCollector::new();
        let before = INTENT_BUILD_FAILURES
            .with_label_values(&["stake", "already_staked"])
            .get();

        collector.record_build_failure(ActionKind::Stake, "already_staked");

        let after = INTENT_BUILD_FAILURES
            .with_label_values(&["stake", "already_staked"])
            .get();
        assert_eq!(after - before, 1);
    }

    #[test]
    fn test_gather_text_contains_batch_outcomes() {
        let collector = MetricsCollector::new();
        collector.record_batch_outcome(ActionKind::Unstake, BatchSummary::PartialFailure);

        let text = collector.gather_text().unwrap();
        assert!(text.contains("stakeflow_batch_outcomes_total"));
        assert!(text.contains("partial_failure"));
    }
}
