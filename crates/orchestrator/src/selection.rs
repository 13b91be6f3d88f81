//! Token selection for the next batch action

use solana_pubkey::Pubkey;
use stakeflow_types::{parse_display_amount, StakedToken, Token, TokenKey, UnstakedToken};
use std::collections::HashMap;
use tracing::debug;

use crate::error::SelectionError;

/// Effect of a toggle call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Inserted,
    Removed,
    /// Existing fungible entry replaced with a new amount
    Replaced,
    /// Nothing to do, e.g. deselecting a token that is not selected
    Ignored,
    /// A batch action is in flight
    Frozen,
}

/// Selected unstaked tokens (for staking) and staked tokens (for unstaking
/// and claiming), in selection order.
///
/// Requested amounts of fungible tokens are kept in a map keyed by token
/// identity, apart from the token records.
#[derive(Debug, Default)]
pub struct SelectionStore {
    unstaked: Vec<UnstakedToken>,
    staked: Vec<StakedToken>,
    amounts: HashMap<TokenKey, String>,
    frozen: bool,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle an unstaked token.
    ///
    /// A fungible token is selected with a non-empty amount, which replaces
    /// any amount recorded before; an empty or absent amount deselects it.
    pub fn toggle_unstaked(
        &mut self,
        token: &UnstakedToken,
        amount: Option<&str>,
    ) -> Result<ToggleOutcome, SelectionError> {
        if self.frozen {
            return Ok(ToggleOutcome::Frozen);
        }

        let key = token.key();
        let position = self.unstaked.iter().position(|t| t.key() == key);

        if !token.is_fungible() {
            return Ok(match position {
                Some(idx) => {
                    self.unstaked.remove(idx);
                    ToggleOutcome::Removed
                }
                None => {
                    self.unstaked.push(token.clone());
                    ToggleOutcome::Inserted
                }
            });
        }

        let amount = amount.map(str::trim).unwrap_or_default();
        if amount.is_empty() {
            return Ok(match position {
                Some(idx) => {
                    self.unstaked.remove(idx);
                    self.amounts.remove(&key);
                    ToggleOutcome::Removed
                }
                None => ToggleOutcome::Ignored,
            });
        }

        if let Err(e) = parse_display_amount(amount) {
            debug!(token = %key, amount, error = %e, "rejected amount");
            return Err(SelectionError::InvalidAmount {
                token: key,
                amount: amount.to_string(),
            });
        }

        self.amounts.insert(key, amount.to_string());
        Ok(match position {
            Some(idx) => {
                self.unstaked[idx] = token.clone();
                ToggleOutcome::Replaced
            }
            None => {
                self.unstaked.push(token.clone());
                ToggleOutcome::Inserted
            }
        })
    }

    /// Toggle a staked token; entries last staked by another wallet are ignored
    pub fn toggle_staked(&mut self, token: &StakedToken, wallet: Option<&Pubkey>) -> ToggleOutcome {
        if self.frozen {
            return ToggleOutcome::Frozen;
        }

        if let Some(entry) = &token.stake_entry {
            if !wallet.is_some_and(|w| entry.is_staked_by(w)) {
                return ToggleOutcome::Ignored;
            }
        }

        let key = token.key();
        match self.staked.iter().position(|t| t.key() == key) {
            Some(idx) => {
                self.staked.remove(idx);
                ToggleOutcome::Removed
            }
            None => {
                self.staked.push(token.clone());
                ToggleOutcome::Inserted
            }
        }
    }

    pub fn toggle(
        &mut self,
        token: &Token,
        amount: Option<&str>,
        wallet: Option<&Pubkey>,
    ) -> Result<ToggleOutcome, SelectionError> {
        match token {
            Token::Unstaked(token) => self.toggle_unstaked(token, amount),
            Token::Staked(token) => Ok(self.toggle_staked(token, wallet)),
        }
    }

    pub fn is_selected(&self, key: &TokenKey) -> bool {
        match key {
            TokenKey::Mint(_) => {
                self.unstaked.iter().any(|t| t.key() == *key)
                    || self.staked.iter().any(|t| t.key() == *key)
            }
            TokenKey::StakeEntry(_) => self.staked.iter().any(|t| t.key() == *key),
        }
    }

    pub fn amount_for(&self, key: &TokenKey) -> Option<&str> {
        self.amounts.get(key).map(String::as_str)
    }

    pub fn unstaked(&self) -> &[UnstakedToken] {
        &self.unstaked
    }

    pub fn staked(&self) -> &[StakedToken] {
        &self.staked
    }

    pub fn amounts(&self) -> &HashMap<TokenKey, String> {
        &self.amounts
    }

    pub fn len(&self) -> usize {
        self.unstaked.len() + self.staked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty both selections and drop every recorded amount
    pub fn clear(&mut self) {
        self.unstaked.clear();
        self.staked.clear();
        self.amounts.clear();
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
