//! Per-token intent building with isolated failures

use futures::future::join_all;
use solana_pubkey::Pubkey;
use stakeflow_types::{
    parse_natural_amount, ActionKind, Notification, OperationIntent, PoolConfig, PreparedIntent,
    ReceiptKind, StakedToken, Token, TokenKey, UnstakedToken,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::traits::{LedgerConnection, NotificationSink, StakeRequest, StakingProgramClient};

/// Inputs shared by every token of one action
#[derive(Clone, Copy, Debug)]
pub struct BuildContext<'a> {
    pub pool: &'a PoolConfig,
    pub wallet: Pubkey,
    pub receipt_kind: ReceiptKind,
}

/// Result of building one action's intents
#[derive(Debug, Default)]
pub struct BuildOutput {
    /// Built intents in selection order; a token's `CreateReceipt`
    /// immediately precedes its `Stake`
    pub intents: Vec<PreparedIntent>,
    pub failures: Vec<(TokenKey, BuildError)>,
    /// At least one unstake will start a cooldown
    pub cooldown_initiated: bool,
}

struct TokenIntents {
    intents: Vec<PreparedIntent>,
    cooldown: bool,
}

impl TokenIntents {
    fn one(intent: PreparedIntent) -> Self {
        Self {
            intents: vec![intent],
            cooldown: false,
        }
    }
}

/// Converts selected tokens into prepared intents
pub struct IntentBuilder {
    client: Arc<dyn StakingProgramClient>,
    connection: Arc<dyn LedgerConnection>,
    notifier: Arc<dyn NotificationSink>,
}

impl IntentBuilder {
    pub fn new(
        client: Arc<dyn StakingProgramClient>,
        connection: Arc<dyn LedgerConnection>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            client,
            connection,
            notifier,
        }
    }

    /// Build intents for every token concurrently.
    ///
    /// A token that fails is reported through the notification sink and
    /// left out; the remaining tokens are always built.
    pub async fn build(
        &self,
        action: ActionKind,
        ctx: &BuildContext<'_>,
        tokens: &[Token],
        amounts: &HashMap<TokenKey, String>,
    ) -> BuildOutput {
        let results = join_all(tokens.iter().map(|token| {
            let amount = amounts.get(&token.key()).map(String::as_str);
            self.build_token(action, ctx, token, amount)
        }))
        .await;

        let mut output = BuildOutput::default();
        for (token, result) in tokens.iter().zip(results) {
            match result {
                Ok(built) => {
                    output.cooldown_initiated |= built.cooldown;
                    for intent in &built.intents {
                        debug!(token = %intent.token, kind = %intent.kind(), "intent built");
                    }
                    output.intents.extend(built.intents);
                }
                Err(e) => {
                    let key = token.key();
                    warn!(action = %action, token = %key, error = %e, "failed to build intent");
                    self.notifier.notify(
                        Notification::error(format!("Failed to {} token {}", action.verb(), key))
                            .with_description(e.to_string()),
                    );
                    output.failures.push((key, e));
                }
            }
        }

        info!(
            action = %action,
            tokens = tokens.len(),
            intents = output.intents.len(),
            failures = output.failures.len(),
            "intents built"
        );
        output
    }

    async fn build_token(
        &self,
        action: ActionKind,
        ctx: &BuildContext<'_>,
        token: &Token,
        amount: Option<&str>,
    ) -> Result<TokenIntents, BuildError> {
        match (action, token) {
            (ActionKind::Stake, Token::Unstaked(token)) => self.build_stake(ctx, token, amount).await,
            (ActionKind::Unstake, Token::Staked(token)) => self.build_unstake(ctx, token).await,
            (ActionKind::ClaimRewards, Token::Staked(token)) => {
                self.build_claim(ctx, token).await.map(TokenIntents::one)
            }
            (ActionKind::Stake, Token::Staked(_))
            | (ActionKind::Unstake, Token::Unstaked(_))
            | (ActionKind::ClaimRewards, Token::Unstaked(_)) => Err(BuildError::UnsupportedToken {
                token: token.key(),
                action,
            }),
        }
    }

    async fn build_stake(
        &self,
        ctx: &BuildContext<'_>,
        token: &UnstakedToken,
        amount: Option<&str>,
    ) -> Result<TokenIntents, BuildError> {
        let key = token.key();
        let token_account = match token.token_account {
            Some(account) => account,
            None => self
                .connection
                .find_token_account(&ctx.wallet, &token.mint)
                .await?
                .ok_or(BuildError::MissingAccount { mint: token.mint })?,
        };

        let natural_amount = if token.is_fungible() {
            if token.staked_balance() > 0 {
                return Err(BuildError::AlreadyStaked { mint: token.mint });
            }
            Some(natural_amount(token, amount)?)
        } else {
            None
        };

        // Receipts are only minted for single units
        let single_unit = natural_amount.map_or(true, |amount| amount == 1);
        let mut intents = Vec::with_capacity(2);

        if single_unit && ctx.receipt_kind == ReceiptKind::Receipt {
            let receipt = self
                .client
                .build_create_receipt(
                    self.connection.as_ref(),
                    &ctx.wallet,
                    &ctx.pool.address,
                    &token.mint,
                )
                .await?;

            match receipt {
                Some(receipt) if !receipt.transaction.is_empty() => {
                    let mut intent = PreparedIntent::new(
                        key,
                        OperationIntent::CreateReceipt {
                            pool: ctx.pool.address,
                            mint: token.mint,
                        },
                        receipt.transaction,
                    );
                    if let Some(stake_mint) = receipt.stake_mint {
                        intent = intent.with_signer(stake_mint);
                    }
                    intents.push(intent);
                }
                _ => debug!(token = %key, "receipt entry already exists"),
            }
        }

        let request = StakeRequest {
            pool: ctx.pool.address,
            mint: token.mint,
            token_account,
            amount: natural_amount,
            receipt_kind: single_unit.then_some(ctx.receipt_kind),
        };
        let transaction = self
            .client
            .build_stake(self.connection.as_ref(), &ctx.wallet, &request)
            .await?;

        intents.push(PreparedIntent::new(
            key,
            OperationIntent::Stake {
                pool: request.pool,
                mint: request.mint,
                token_account: request.token_account,
                amount: request.amount,
                receipt_kind: request.receipt_kind,
            },
            transaction,
        ));

        Ok(TokenIntents {
            intents,
            cooldown: false,
        })
    }

    async fn build_unstake(
        &self,
        ctx: &BuildContext<'_>,
        token: &StakedToken,
    ) -> Result<TokenIntents, BuildError> {
        let entry = token
            .stake_entry
            .as_ref()
            .ok_or(BuildError::MissingStakeEntry { token: token.key() })?;

        let cooldown = ctx.pool.enforces_cooldown()
            && !entry.cooldown_started()
            && !ctx.pool.has_min_stake_duration();
        if cooldown {
            let name = token
                .name
                .clone()
                .unwrap_or_else(|| entry.address.to_string());
            self.notifier.notify(Notification::info(format!(
                "Cooldown period will be initiated for {name} unless minimum stake period unsatisfied"
            )));
        }

        let transaction = self
            .client
            .build_unstake(
                self.connection.as_ref(),
                &ctx.wallet,
                &ctx.pool.address,
                &entry.original_mint,
            )
            .await?;

        Ok(TokenIntents {
            intents: vec![PreparedIntent::new(
                token.key(),
                OperationIntent::Unstake {
                    pool: ctx.pool.address,
                    mint: entry.original_mint,
                    stake_entry: entry.address,
                },
                transaction,
            )],
            cooldown,
        })
    }

    async fn build_claim(
        &self,
        ctx: &BuildContext<'_>,
        token: &StakedToken,
    ) -> Result<PreparedIntent, BuildError> {
        let entry = token
            .stake_entry
            .as_ref()
            .ok_or(BuildError::MissingStakeEntry { token: token.key() })?;

        let transaction = self
            .client
            .build_claim(
                self.connection.as_ref(),
                &ctx.wallet,
                &ctx.pool.address,
                &entry.address,
            )
            .await?;

        Ok(PreparedIntent::new(
            token.key(),
            OperationIntent::ClaimRewards {
                pool: ctx.pool.address,
                stake_entry: entry.address,
            },
            transaction,
        ))
    }
}

fn natural_amount(token: &UnstakedToken, amount: Option<&str>) -> Result<u64, BuildError> {
    let invalid = |reason: String| BuildError::InvalidAmount {
        token: token.key(),
        reason,
    };

    let amount = amount
        .map(str::trim)
        .filter(|amount| !amount.is_empty())
        .ok_or_else(|| invalid("no amount chosen".to_string()))?;
    let decimals = token
        .decimals
        .ok_or_else(|| invalid("decimal precision unknown".to_string()))?;

    match parse_natural_amount(amount, decimals) {
        Ok(0) => Err(invalid(format!("{amount} is below the smallest unit"))),
        Ok(natural) => Ok(natural),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLedger, MockProgramClient, RecordingSink};
    use stakeflow_types::{IntentKind, NotificationKind, StakeEntry};

    fn key(seed: u8) -> Pubkey {
        Pubkey::new_from_array([seed; 32])
    }

    fn wallet() -> Pubkey {
        key(90)
    }

    fn pool() -> PoolConfig {
        PoolConfig::new(key(80))
    }

    fn entry(seed: u8, amount: u64) -> StakeEntry {
        StakeEntry {
            address: key(seed + 100),
            pool: key(80),
            original_mint: key(seed),
            last_staker: wallet(),
            amount,
            cooldown_start_seconds: None,
        }
    }

    fn nft(seed: u8) -> Token {
        UnstakedToken::new(key(seed), 1)
            .with_token_account(key(seed + 50))
            .into()
    }

    struct Harness {
        builder: IntentBuilder,
        client: Arc<MockProgramClient>,
        sink: Arc<RecordingSink>,
    }

    fn harness(ledger: MockLedger) -> Harness {
        let client = Arc::new(MockProgramClient::new());
        let sink = Arc::new(RecordingSink::new());
        Harness {
            builder: IntentBuilder::new(client.clone(), Arc::new(ledger), sink.clone()),
            client,
            sink,
        }
    }

    fn kinds(output: &BuildOutput) -> Vec<IntentKind> {
        output.intents.iter().map(|i| i.kind()).collect()
    }

    #[tokio::test]
    async fn test_isolates_failing_tokens() {
        let h = harness(MockLedger::new());
        h.client.fail_for(key(2));

        let tokens = vec![
            nft(1),
            nft(2),
            UnstakedToken::new(key(3), 1).into(),
            nft(4),
        ];
        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };

        let output = h
            .builder
            .build(ActionKind::Stake, &ctx, &tokens, &HashMap::new())
            .await;

        assert_eq!(output.intents.len(), 2);
        assert_eq!(output.failures.len(), 2);
        assert!(matches!(output.failures[0].1, BuildError::Program(_)));
        assert!(matches!(
            output.failures[1].1,
            BuildError::MissingAccount { .. }
        ));
        assert_eq!(h.sink.count(NotificationKind::Error), 2);
        assert_eq!(output.intents[0].token, tokens[0].key());
        assert_eq!(output.intents[1].token, tokens[3].key());
    }

    #[tokio::test]
    async fn test_resolves_missing_token_account_from_ledger() {
        let h = harness(MockLedger::new().with_account(wallet(), key(3), key(33)));
        let tokens = vec![UnstakedToken::new(key(3), 1).into()];
        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };

        let output = h
            .builder
            .build(ActionKind::Stake, &ctx, &tokens, &HashMap::new())
            .await;

        match &output.intents[0].intent {
            OperationIntent::Stake { token_account, .. } => assert_eq!(*token_account, key(33)),
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ledger_error_is_per_token() {
        let h = harness(MockLedger::failing());
        let tokens = vec![UnstakedToken::new(key(3), 1).into(), nft(4)];
        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };

        let output = h
            .builder
            .build(ActionKind::Stake, &ctx, &tokens, &HashMap::new())
            .await;

        assert_eq!(kinds(&output), vec![IntentKind::Stake]);
        assert_eq!(output.failures[0].1.reason(), "ledger");
    }

    #[tokio::test]
    async fn test_fungible_stake_rules() {
        let h = harness(MockLedger::new());
        let staked_before: Token = UnstakedToken::new(key(1), 10)
            .with_token_account(key(51))
            .with_decimals(0)
            .with_stake_entry(entry(1, 4))
            .into();
        let no_amount: Token = UnstakedToken::new(key(2), 10)
            .with_token_account(key(52))
            .with_decimals(0)
            .into();
        let no_decimals: Token = UnstakedToken::new(key(3), 10)
            .with_token_account(key(53))
            .into();
        let dust: Token = UnstakedToken::new(key(4), 10)
            .with_token_account(key(54))
            .with_decimals(2)
            .into();

        let mut amounts = HashMap::new();
        amounts.insert(staked_before.key(), "1".to_string());
        amounts.insert(no_decimals.key(), "1".to_string());
        amounts.insert(dust.key(), "0.001".to_string());

        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };
        let output = h
            .builder
            .build(
                ActionKind::Stake,
                &ctx,
                &[staked_before, no_amount, no_decimals, dust],
                &amounts,
            )
            .await;

        assert!(output.intents.is_empty());
        let reasons: Vec<&str> = output.failures.iter().map(|(_, e)| e.reason()).collect();
        assert_eq!(
            reasons,
            vec!["already_staked", "invalid_amount", "invalid_amount", "invalid_amount"]
        );
    }

    #[tokio::test]
    async fn test_receipt_only_for_single_units() {
        let h = harness(MockLedger::new());
        let fungible: Token = UnstakedToken::new(key(2), 10)
            .with_token_account(key(52))
            .with_decimals(0)
            .into();
        let one_unit: Token = UnstakedToken::new(key(3), 10)
            .with_token_account(key(53))
            .with_decimals(0)
            .into();
        let mut amounts = HashMap::new();
        amounts.insert(fungible.key(), "4".to_string());
        amounts.insert(one_unit.key(), "1".to_string());

        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Receipt,
        };
        let output = h
            .builder
            .build(
                ActionKind::Stake,
                &ctx,
                &[nft(1), fungible, one_unit],
                &amounts,
            )
            .await;

        assert_eq!(
            kinds(&output),
            vec![
                IntentKind::CreateReceipt,
                IntentKind::Stake,
                IntentKind::Stake,
                IntentKind::CreateReceipt,
                IntentKind::Stake,
            ]
        );
        assert_eq!(output.intents[0].signers.len(), 1);
        assert_eq!(
            output.intents[2].intent,
            OperationIntent::Stake {
                pool: key(80),
                mint: key(2),
                token_account: key(52),
                amount: Some(4),
                receipt_kind: None,
            }
        );
        assert_eq!(
            output.intents[4].intent,
            OperationIntent::Stake {
                pool: key(80),
                mint: key(3),
                token_account: key(53),
                amount: Some(1),
                receipt_kind: Some(ReceiptKind::Receipt),
            }
        );
    }

    #[tokio::test]
    async fn test_existing_receipt_entry_skips_creation() {
        let h = harness(MockLedger::new());
        h.client.receipt_exists(key(1));
        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Receipt,
        };

        let output = h
            .builder
            .build(ActionKind::Stake, &ctx, &[nft(1)], &HashMap::new())
            .await;

        assert_eq!(kinds(&output), vec![IntentKind::Stake]);
    }

    #[tokio::test]
    async fn test_unstake_cooldown_notice() {
        let h = harness(MockLedger::new());
        let pool = pool().with_cooldown(60);
        let mut cooling = entry(2, 1);
        cooling.cooldown_start_seconds = Some(1_700_000_000);
        let tokens: Vec<Token> = vec![
            StakedToken::new(entry(1, 1)).with_name("Degen #1").into(),
            StakedToken::new(cooling).into(),
        ];
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };

        let output = h
            .builder
            .build(ActionKind::Unstake, &ctx, &tokens, &HashMap::new())
            .await;

        assert_eq!(kinds(&output), vec![IntentKind::Unstake, IntentKind::Unstake]);
        assert!(output.cooldown_initiated);
        let infos = h.sink.of_kind(NotificationKind::Info);
        assert_eq!(infos.len(), 1);
        assert!(infos[0].message.contains("Degen #1"));
    }

    #[tokio::test]
    async fn test_min_stake_duration_suppresses_cooldown_notice() {
        let h = harness(MockLedger::new());
        let pool = pool().with_cooldown(60).with_min_stake(30);
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };

        let output = h
            .builder
            .build(
                ActionKind::Unstake,
                &ctx,
                &[StakedToken::new(entry(1, 1)).into()],
                &HashMap::new(),
            )
            .await;

        assert_eq!(output.intents.len(), 1);
        assert!(!output.cooldown_initiated);
        assert!(h.sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_claim_requires_stake_entry() {
        let h = harness(MockLedger::new());
        let pool = pool();
        let ctx = BuildContext {
            pool: &pool,
            wallet: wallet(),
            receipt_kind: ReceiptKind::Original,
        };
        let tokens: Vec<Token> = vec![
            StakedToken::without_entry(key(1)).into(),
            StakedToken::new(entry(2, 1)).into(),
            nft(3),
        ];

        let output = h
            .builder
            .build(ActionKind::ClaimRewards, &ctx, &tokens, &HashMap::new())
            .await;

        assert_eq!(kinds(&output), vec![IntentKind::ClaimRewards]);
        let reasons: Vec<&str> = output.failures.iter().map(|(_, e)| e.reason()).collect();
        assert_eq!(reasons, vec!["missing_stake_entry", "unsupported_token"]);

        let errors = h.sink.of_kind(NotificationKind::Error);
        assert_eq!(errors[0].message, format!("Failed to claim rewards for token {}", key(1)));
    }
}
