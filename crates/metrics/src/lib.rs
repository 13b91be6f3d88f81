//! Metrics and tracing for batch staking actions
//!
//! Counters cover the lifecycle of each orchestrator action: validation,
//! per-token intent building, batch submission and cache refresh. They are
//! registered in the default Prometheus registry and can be rendered in the
//! text exposition format with [`MetricsCollector::gather_text`].
//!
//! # Example
//!
//! ```no_run
//! use stakeflow_metrics::{init_tracing, MetricsCollector};
//! use stakeflow_types::ActionKind;
//!
//! init_tracing("info").unwrap();
//! let collector = MetricsCollector::new();
//! collector.record_action_started(ActionKind::Stake);
//! println!("{}", collector.gather_text().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use crate::tracing::{init_tracing, ActionSpan, CorrelationId, TracingError, DEFAULT_FILTER};
