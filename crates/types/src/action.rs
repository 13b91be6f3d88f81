use serde::{Deserialize, Serialize};
use std::fmt;

/// User-facing batch action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Stake,
    Unstake,
    ClaimRewards,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Stake => "stake",
            ActionKind::Unstake => "unstake",
            ActionKind::ClaimRewards => "claim_rewards",
        }
    }

    /// Verb used in per-token failure messages
    pub fn verb(&self) -> &'static str {
        match self {
            ActionKind::Stake => "stake",
            ActionKind::Unstake => "unstake",
            ActionKind::ClaimRewards => "claim rewards for",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tokens an action operates on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionScope {
    /// The current selection
    #[default]
    Selected,
    /// Every token of the supplied source collection
    All,
}
