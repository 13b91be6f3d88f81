use stakeflow_types::ActionKind;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,stakeflow=debug";

/// Initialize JSON tracing output.
///
/// `RUST_LOG` takes precedence over `filter`; an empty `filter` falls back to
/// [`DEFAULT_FILTER`].
pub fn init_tracing(filter: &str) -> Result<(), TracingError> {
    let fallback = if filter.trim().is_empty() {
        DEFAULT_FILTER
    } else {
        filter
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .map_err(|e| TracingError::InvalidFilter(e.to_string()))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Correlation ID tying together the log lines of one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one orchestrator action
#[derive(Debug, Clone)]
pub struct ActionSpan {
    pub correlation_id: CorrelationId,
    pub action: ActionKind,
}

impl ActionSpan {
    pub fn new(action: ActionKind) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            action,
        }
    }

    /// Span to instrument the action future with
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "action",
            correlation_id = %self.correlation_id,
            action = %self.action,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid tracing filter: {0}")]
    InvalidFilter(String),

    #[error("tracing initialization error: {0}")]
    InitError(String),
}
