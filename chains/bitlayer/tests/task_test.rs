mod common;

use bitlayer_project::task::contracts::{self, BITCOW};
use bitlayer_project::task::{
    require_min_balance, AvalonDepositTask, BitcowSwapTask, Environment, LayerbankSupplyTask,
    OwltoCheckInTask, ParseAccounts, Skip, SwapTarget, Task, TaskAction,
};
use bitlayer_project::task::t01_parse_accounts::TX_COUNT_HEADER;
use common::{
    account, config, policy, task_context, CountingPacer, LogCapture, Mined, MockChainClient,
    MockConnector,
};
use core_logic::{AccountAction, Batch, CsvReport};
use ethers::abi::Token;
use ethers::types::U256;
use ethers::utils::id;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

fn milli_btc(n: u64) -> U256 {
    U256::exp10(15) * n
}

#[tokio::test]
async fn test_low_balance_skips_without_transaction() {
    let client = Arc::new(MockChainClient::bitlayer().with_balance(U256::exp10(14)));
    let pacer = Arc::new(CountingPacer::default());
    let ctx = task_context(client.clone(), pacer.clone());

    let result = AvalonDepositTask.run(ctx).await.unwrap();

    assert!(result.skipped);
    assert!(!result.success);
    assert!(result.message.contains("under 0.001"));
    assert!(client.sent().is_empty());
    assert_eq!(client.nonce_reads.load(Ordering::SeqCst), 0);
    assert_eq!(pacer.count(), 0);
}

#[tokio::test]
async fn test_min_balance_threshold_is_inclusive() {
    let client = Arc::new(MockChainClient::bitlayer().with_balance(milli_btc(1)));
    let ctx = task_context(client, Arc::new(CountingPacer::default()));

    assert_eq!(require_min_balance(&ctx, milli_btc(1)).await, Ok(()));
    assert!(matches!(
        require_min_balance(&ctx, milli_btc(2)).await,
        Err(Skip(_))
    ));
}

#[tokio::test]
async fn test_supply_sends_configured_value() {
    let client = Arc::new(MockChainClient::bitlayer().with_balance(milli_btc(5)));
    let pacer = Arc::new(CountingPacer::default());
    let ctx = task_context(client.clone(), pacer);

    let result = LayerbankSupplyTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert!(result.tx_hash.is_some());
    let sent = client.sent();
    assert_eq!(sent.len(), 1);

    // default deposit range is [0.0000001, 0.000001] BTC
    let value = sent[0].value;
    assert!(value >= U256::exp10(11) && value <= U256::exp10(12));
}

#[tokio::test]
async fn test_check_in_goes_through_action_adapter() {
    let client = Arc::new(MockChainClient::bitlayer());
    let pacer = Arc::new(CountingPacer::default());
    let env = Environment {
        connector: Arc::new(MockConnector::new(vec![client.clone()])),
        config: Arc::new(config()),
        pacer,
        policy: policy(1),
    };
    let action = TaskAction::new(Arc::new(OwltoCheckInTask), env);
    let batch = Batch::new(vec![account()], &[]);

    let result = action.run(&batch.entries()[0], 1, 1).await.unwrap();

    assert_eq!(action.name(), "09_owltoCheckIn");
    assert!(result.success, "{}", result.message);
    assert_eq!(client.sent().len(), 1);
    assert_eq!(client.sent()[0].value, U256::zero());
}

#[tokio::test]
async fn test_parse_accounts_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let report = CsvReport::new(dir.path().join("tx_count.csv"), &TX_COUNT_HEADER);
    let client = MockChainClient::bitlayer().with_balance(milli_btc(250));

    let stats = ParseAccounts::run(&[account()], &client, &report, Some(60_000.0))
        .await
        .unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].tx_count, 7);
    assert!((stats[0].balance - 0.25).abs() < 1e-12);
    assert_eq!(stats[0].balance_usd, Some(15000.0));

    let content = std::fs::read_to_string(report.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("TX count"));
    assert!(lines[0].ends_with("USD"));
    assert!(lines[1].contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    assert!(lines[1].ends_with(",7,0.25000000,15000.00"));
}

#[tokio::test]
async fn test_parse_accounts_without_price_leaves_usd_blank() {
    let dir = tempfile::tempdir().unwrap();
    let report = CsvReport::new(dir.path().join("tx_count.csv"), &TX_COUNT_HEADER);
    let client = MockChainClient::bitlayer().with_balance(milli_btc(250));

    let stats = ParseAccounts::run(&[account()], &client, &report, None)
        .await
        .unwrap();

    assert_eq!(stats[0].balance_usd, None);
    let content = std::fs::read_to_string(report.path()).unwrap();
    assert!(content.lines().nth(1).unwrap().ends_with(",7,0.25000000,"));
}

#[tokio::test]
async fn test_reverse_swap_runs_after_forward_reverts() {
    let logs = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(LogCapture(logs.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = Arc::new(
        MockChainClient::bitlayer()
            .with_balance(milli_btc(5))
            .with_receipts(&[Mined::Reverted, Mined::Reverted])
            .with_call("balanceOf(address)", vec![Token::Uint(U256::from(50_000u64))])
            .with_call("decimals()", vec![Token::Uint(U256::from(8u64))])
            .with_call("symbol()", vec![Token::String("WBTC".to_string())])
            .with_call("allowance(address,address)", vec![Token::Uint(U256::MAX)]),
    );
    let pacer = Arc::new(CountingPacer::default());
    let ctx = task_context(client.clone(), pacer.clone());

    let result = BitcowSwapTask::new(SwapTarget::Wbtc).run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("forward failed, reverse confirmed"));

    let router = contracts::address(BITCOW).unwrap();
    let sent = client.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|tx| tx.to == Some(router)));
    assert_eq!(sent[0].selector(), Some(id("swapBTCtoWBTC(address)")));
    assert!(!sent[0].value.is_zero());
    assert_eq!(sent[2].selector(), Some(id("swapWBTCtoBTC(address,uint256)")));
    assert!(sent[2].value.is_zero());

    // one backoff between the forward attempts, no pause after a failed leg
    assert_eq!(pacer.count(), 1);

    let logs = logs.lock().unwrap();
    assert!(logs.iter().any(|m| m.contains("BTC > WBTC") && m.contains("Tx FAILED (attempt 2/2)")));
    assert!(logs.iter().any(|m| m.contains("WBTC > BTC") && m.contains("Tx confirmed | SUCCESS")));
    assert!(logs.iter().any(|m| m.contains("Swap legs: forward failed, reverse confirmed")));
}

#[tokio::test]
async fn test_reverse_swap_approves_when_allowance_short() {
    let client = Arc::new(
        MockChainClient::bitlayer()
            .with_balance(milli_btc(5))
            .with_call("balanceOf(address)", vec![Token::Uint(U256::from(50_000u64))])
            .with_call("decimals()", vec![Token::Uint(U256::from(8u64))])
            .with_call("symbol()", vec![Token::String("WBTC".to_string())])
            .with_call("allowance(address,address)", vec![Token::Uint(U256::zero())]),
    );
    let ctx = task_context(client.clone(), Arc::new(CountingPacer::default()));

    let result = BitcowSwapTask::new(SwapTarget::Wbtc).run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    let selectors: Vec<_> = client.sent().iter().map(|tx| tx.selector()).collect();
    assert_eq!(
        selectors,
        vec![
            Some(id("swapBTCtoWBTC(address)")),
            Some(id("approve(address,uint256)")),
            Some(id("swapWBTCtoBTC(address,uint256)")),
        ]
    );
}
