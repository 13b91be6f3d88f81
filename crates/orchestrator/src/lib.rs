pub mod builder;
pub mod error;
pub mod executor;
pub mod mock;
pub mod orchestrator;
pub mod refresh;
pub mod selection;
pub mod traits;


// Re-export main types
pub use builder::{BuildContext, BuildOutput, IntentBuilder};
pub use error::{
    BuildError, LedgerError, OrchestratorError, ProgramError, SelectionError, SigningError,
    SubmissionError, SubmissionFailure, ValidationError, ViewError, Wave,
};
pub use executor::BatchExecutor;
pub use orchestrator::{
    ActionReport, BuilderError, OrchestratorConfig, OrchestratorState, StakingOrchestrator,
    StakingOrchestratorBuilder, SuccessMessages,
};
pub use refresh::{CachedViews, RefreshScheduler, DEFAULT_SETTLEMENT_DELAY};
pub use selection::{SelectionStore, ToggleOutcome};
pub use traits::{
    CachedView, LedgerConnection, NotificationSink, ReceiptTransaction, SigningContext,
    StakeRequest, StakingProgramClient, SubmissionService, SubmitOptions,
};
