use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{IntentKind, TokenKey, TransactionSignature};

/// Ledger status of one submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Submitted(TransactionSignature),
    Failed(String),
}

impl TransactionStatus {
    pub fn is_submitted(&self) -> bool {
        matches!(self, TransactionStatus::Submitted(_))
    }
}

/// Result of one intent within a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    pub token: TokenKey,
    pub kind: IntentKind,
    pub status: TransactionStatus,
}

impl IntentResult {
    pub fn new(token: TokenKey, kind: IntentKind, status: TransactionStatus) -> Self {
        Self {
            token,
            kind,
            status,
        }
    }
}

/// Aggregate classification of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchSummary {
    Success,
    PartialFailure,
    TotalFailure,
    /// Nothing was submitted
    Empty,
}

impl BatchSummary {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchSummary::Success => "success",
            BatchSummary::PartialFailure => "partial_failure",
            BatchSummary::TotalFailure => "total_failure",
            BatchSummary::Empty => "empty",
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered per-intent results of one batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    results: Vec<IntentResult>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: IntentResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[IntentResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn submitted_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.is_submitted())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.submitted_count()
    }

    pub fn summary(&self) -> BatchSummary {
        match (self.submitted_count(), self.failed_count()) {
            (0, 0) => BatchSummary::Empty,
            (_, 0) => BatchSummary::Success,
            (0, _) => BatchSummary::TotalFailure,
            _ => BatchSummary::PartialFailure,
        }
    }
}
