//! Batch staking orchestration.
//!
//! This facade re-exports the workspace crates:
//!
//! - [`types`]: token model, pool configuration, intents and batch outcomes
//! - [`orchestrator`]: selection, intent building, batch submission and refresh
//! - [`config`]: file and environment configuration plus stake-pool resolution
//! - [`metrics`]: Prometheus counters and tracing setup

pub use stakeflow_config as config;
pub use stakeflow_metrics as metrics;
pub use stakeflow_orchestrator as orchestrator;
pub use stakeflow_types as types;

/// Install the JSON tracing subscriber at the configured `network.log_level`.
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_tracing(config: &config::AppConfig) -> Result<(), metrics::TracingError> {
    metrics::init_tracing(&config.network.log_filter())
}
