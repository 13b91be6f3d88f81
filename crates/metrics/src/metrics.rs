use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // ACTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Actions started, by action kind
    pub static ref ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stakeflow_actions_total",
        "Total batch actions started",
        &["action"]
    )
    .unwrap();

    /// Actions rejected before any intent was built
    pub static ref ACTION_VALIDATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "stakeflow_action_validation_failures_total",
        "Total actions aborted during validation",
        &["action"]
    )
    .unwrap();

    /// End-to-end action duration
    pub static ref ACTION_DURATION: HistogramVec = register_histogram_vec!(
        "stakeflow_action_duration_ms",
        "Batch action duration in milliseconds",
        &["action"],
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // INTENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Intents successfully built, by intent kind
    pub static ref INTENTS_BUILT: IntCounterVec = register_int_counter_vec!(
        "stakeflow_intents_built_total",
        "Total operation intents built",
        &["kind"]
    )
    .unwrap();

    /// Per-token build failures
    pub static ref INTENT_BUILD_FAILURES: IntCounterVec = register_int_counter_vec!(
        "stakeflow_intent_build_failures_total",
        "Total tokens excluded from a batch by build errors",
        &["action", "reason"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Batch outcomes by summary
    pub static ref BATCH_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "stakeflow_batch_outcomes_total",
        "Total batches by aggregate outcome",
        &["action", "summary"]
    )
    .unwrap();

    /// Submission service calls that failed outright
    pub static ref SUBMISSION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "stakeflow_submission_failures_total",
        "Total batches whose submission call failed",
        &["action"]
    )
    .unwrap();

    /// Delayed cache refreshes scheduled
    pub static ref REFRESHES_SCHEDULED: IntCounter = register_int_counter!(
        "stakeflow_refreshes_scheduled_total",
        "Total delayed cache refreshes scheduled"
    )
    .unwrap();
}
