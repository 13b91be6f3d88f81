use solana_pubkey::Pubkey;
use stakeflow::config::ConfigLoader;
use stakeflow::orchestrator::mock::{
    MockLedger, MockProgramClient, MockSigner, MockSubmissionService, MockView, RecordingSink,
};
use stakeflow::orchestrator::{
    CachedViews, OrchestratorConfig, OrchestratorError, StakingOrchestrator, ToggleOutcome,
};
use stakeflow::types::{
    ActionScope, BatchSummary, IntentKind, NotificationKind, PoolConfig, ReceiptKind, StakeEntry,
    StakedToken, UnstakedToken,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════
// TEST HARNESS
// ═══════════════════════════════════════════════════════════════════════════

fn key(seed: u8) -> Pubkey {
    Pubkey::new_from_array([seed; 32])
}

fn wallet() -> Pubkey {
    key(200)
}

fn pool_address() -> Pubkey {
    key(201)
}

struct TestEnv {
    orchestrator: StakingOrchestrator,
    client: Arc<MockProgramClient>,
    service: Arc<MockSubmissionService>,
    signer: Arc<MockSigner>,
    sink: Arc<RecordingSink>,
    views: Vec<Arc<MockView>>,
}

fn setup(pool: PoolConfig, config: OrchestratorConfig) -> TestEnv {
    let sink = Arc::new(RecordingSink::new());
    let client = Arc::new(MockProgramClient::new());
    let service = Arc::new(MockSubmissionService::new(sink.clone()));
    let signer = Arc::new(MockSigner::connected(wallet()));
    let views: Vec<Arc<MockView>> = ["allowed_tokens", "staked_tokens", "pool_entries"]
        .into_iter()
        .map(|name| Arc::new(MockView::new(name)))
        .collect();

    let orchestrator = StakingOrchestrator::builder()
        .with_signing(signer.clone())
        .with_connection(Arc::new(
            MockLedger::new().with_account(wallet(), key(9), key(59)),
        ))
        .with_program(client.clone())
        .with_submission(service.clone())
        .with_notifier(sink.clone())
        .with_views(CachedViews {
            allowed_tokens: views[0].clone(),
            staked_tokens: views[1].clone(),
            pool_entries: views[2].clone(),
        })
        .with_pool(pool)
        .with_config(config.with_settlement_delay(Duration::from_millis(20)))
        .build()
        .expect("all collaborators set");

    TestEnv {
        orchestrator,
        client,
        service,
        signer,
        sink,
        views,
    }
}

fn stake_entry(seed: u8, cooldown_start_seconds: Option<i64>) -> StakeEntry {
    StakeEntry {
        address: key(seed + 100),
        pool: pool_address(),
        original_mint: key(seed),
        last_staker: wallet(),
        amount: 1,
        cooldown_start_seconds,
    }
}

fn built_kinds(env: &TestEnv) -> Vec<IntentKind> {
    env.client.calls().into_iter().map(|(kind, _)| kind).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// END-TO-END ACTIONS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_stake_single_nft_with_original_receipt_kind() {
    let env = setup(
        PoolConfig::new(pool_address()).with_receipt_kind(ReceiptKind::Original),
        OrchestratorConfig::default(),
    );
    let token = UnstakedToken::new(key(1), 1)
        .with_token_account(key(51))
        .with_name("Degen #1");

    assert_eq!(
        env.orchestrator.toggle_unstaked(&token, None).await.unwrap(),
        ToggleOutcome::Inserted
    );
    let report = env
        .orchestrator
        .stake(ActionScope::Selected, &[])
        .await
        .unwrap();

    assert_eq!(built_kinds(&env), vec![IntentKind::Stake]);
    assert_eq!(report.built, 1);
    assert_eq!(report.summary(), BatchSummary::Success);

    let waves = env.service.waves();
    assert_eq!(waves.len(), 1);
    assert_eq!(waves[0].subjects(), vec![key(1)]);
    assert_eq!(env.signer.sent().len(), 1);
    assert!(!env.orchestrator.is_selected(&token.key()).await);
}

#[tokio::test]
async fn test_stake_fungible_amount_in_natural_units() {
    let env = setup(PoolConfig::new(pool_address()), OrchestratorConfig::default());
    let token = UnstakedToken::new(key(2), 5)
        .with_token_account(key(52))
        .with_decimals(6);

    env.orchestrator
        .toggle_unstaked(&token, Some("2.5"))
        .await
        .unwrap();
    let report = env
        .orchestrator
        .stake(ActionScope::Selected, &[])
        .await
        .unwrap();

    let outcome = report.outcome.expect("batch submitted");
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.results()[0].kind, IntentKind::Stake);

    let staked_amounts: Vec<Option<u64>> = env
        .client
        .stake_requests()
        .into_iter()
        .map(|request| request.amount)
        .collect();
    assert_eq!(staked_amounts, vec![Some(2_500_000)]);
}

#[tokio::test]
async fn test_unstake_with_cooldown_notice() {
    let env = setup(
        PoolConfig::new(pool_address()).with_cooldown(86_400),
        OrchestratorConfig::default(),
    );
    let token = StakedToken::new(stake_entry(3, None)).with_name("Degen #3");

    assert_eq!(
        env.orchestrator.toggle_staked(&token).await,
        ToggleOutcome::Inserted
    );
    let report = env
        .orchestrator
        .unstake(ActionScope::Selected, &[])
        .await
        .unwrap();

    let infos = env.sink.of_kind(NotificationKind::Info);
    assert_eq!(infos.len(), 1);
    assert_eq!(
        infos[0].message,
        "Cooldown period will be initiated for Degen #3 unless minimum stake period unsatisfied"
    );
    assert_eq!(built_kinds(&env), vec![IntentKind::Unstake]);
    assert!(report.cooldown_initiated);

    let success = env.sink.of_kind(NotificationKind::Success);
    assert_eq!(success[0].message, "Successfully initiated cooldown");
}

#[tokio::test]
async fn test_receipt_stake_runs_two_waves() {
    let env = setup(
        PoolConfig::new(pool_address()).with_receipt_kind(ReceiptKind::Receipt),
        OrchestratorConfig::default(),
    );
    let nft = UnstakedToken::new(key(1), 1).with_token_account(key(51));
    let fungible = UnstakedToken::new(key(2), 5)
        .with_token_account(key(52))
        .with_decimals(0);

    env.orchestrator.toggle_unstaked(&nft, None).await.unwrap();
    env.orchestrator
        .toggle_unstaked(&fungible, Some("3"))
        .await
        .unwrap();
    let report = env
        .orchestrator
        .stake(ActionScope::Selected, &[])
        .await
        .unwrap();

    let waves = env.service.waves();
    assert_eq!(waves.len(), 2);
    assert_eq!(waves[0].subjects(), vec![key(1)]);
    assert_eq!(waves[1].subjects(), vec![key(1), key(2)]);
    assert_eq!(report.built, 3);
    assert_eq!(env.sink.count(NotificationKind::Success), 1);
}

#[tokio::test]
async fn test_partial_failures_do_not_abort_the_batch() {
    let env = setup(PoolConfig::new(pool_address()), OrchestratorConfig::default());
    let already_staked = UnstakedToken::new(key(4), 10)
        .with_token_account(key(54))
        .with_decimals(0)
        .with_stake_entry(StakeEntry {
            amount: 6,
            ..stake_entry(4, None)
        });
    // Resolved through the ledger
    let ledger_account = UnstakedToken::new(key(9), 1);
    let missing_account = UnstakedToken::new(key(5), 1);

    let all = vec![already_staked, ledger_account, missing_account];
    let report = env
        .orchestrator
        .stake(ActionScope::All, &all)
        .await
        .unwrap();

    assert_eq!(report.considered, 3);
    assert_eq!(report.built, 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(env.sink.count(NotificationKind::Error), 2);
    assert_eq!(env.service.waves()[0].subjects(), vec![key(9)]);
}

#[tokio::test]
async fn test_claim_all_refreshes_views() {
    let env = setup(PoolConfig::new(pool_address()), OrchestratorConfig::default());
    let tokens = vec![
        StakedToken::new(stake_entry(6, None)),
        StakedToken::new(stake_entry(7, Some(1_700_000_000))),
    ];

    let report = env
        .orchestrator
        .claim_rewards(ActionScope::All, &tokens)
        .await
        .unwrap();
    assert_eq!(report.built, 2);

    env.orchestrator.wait_for_refresh().await;
    for view in &env.views {
        assert_eq!(view.invalidations(), 1);
        assert_eq!(view.refetches(), 1);
    }
    let success = env.sink.of_kind(NotificationKind::Success);
    assert_eq!(success[0].message, "Successfully claimed rewards");
}

#[tokio::test]
async fn test_submission_failure_is_reported_to_caller() {
    let env = setup(PoolConfig::new(pool_address()), OrchestratorConfig::default());
    env.service.fail_call(0);
    let token = UnstakedToken::new(key(1), 1).with_token_account(key(51));
    env.orchestrator.toggle_unstaked(&token, None).await.unwrap();

    let err = env
        .orchestrator
        .stake(ActionScope::Selected, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Submission(_)));
    assert!(!env.orchestrator.is_selected(&token.key()).await);
    assert!(!env.orchestrator.is_busy());
}

#[tokio::test]
async fn test_shipped_devnet_config_drives_orchestrator() {
    let app = ConfigLoader::from_file(Path::new("config/devnet.toml")).unwrap();
    let resolved = app.resolve_pool().expect("devnet pool resolves");
    let config = OrchestratorConfig::from(&app);
    assert_eq!(config.receipt_kind, Some(ReceiptKind::Receipt));

    let env = setup(PoolConfig::new(resolved.address), config);
    assert_eq!(env.orchestrator.receipt_kind().await, ReceiptKind::Receipt);
}

#[test]
fn test_tracing_follows_configured_log_level() {
    let app = ConfigLoader::from_file(Path::new("config/local.toml")).unwrap();
    assert_eq!(app.network.log_filter(), "trace");
    assert!(stakeflow::init_tracing(&app).is_ok());
}
