mod common;

use bitlayer_project::api::btc_usd_price;
use bitlayer_project::task::{
    AssembleCarTask, BtcfiDailyCheckTask, LuckyDrawTask, Task, TaskContext, TreasureBoxTask,
};
use common::{config_for_site, task_context_with, CountingPacer, MockChainClient, MockSite};
use serde_json::{json, Value};
use std::sync::Arc;

fn ok() -> Value {
    json!({"message": "ok"})
}

fn declined() -> Value {
    json!({"message": "not enough parts"})
}

fn garage() -> Value {
    json!({"userInfo": {"normalCarAmount": 2, "premiumCarAmount": 1, "topCarAmount": 0}})
}

async fn context_for(site: &MockSite) -> (TaskContext, Arc<CountingPacer>) {
    let base_url = site.serve().await;
    let pacer = Arc::new(CountingPacer::default());
    let ctx = task_context_with(
        Arc::new(MockChainClient::bitlayer()),
        pacer.clone(),
        config_for_site(&base_url),
    );
    (ctx, pacer)
}

#[tokio::test]
async fn test_treasure_box_waits_for_unboxing() {
    let site = MockSite::new()
        .route(
            "GET",
            "/api/mining-gala/box",
            vec![json!({"box_id": "b-7", "expire_at": 0, "count": 10})],
        )
        .route(
            "GET",
            "/api/mining-gala/result/b-7",
            vec![
                json!({"status": 1}),
                json!({"status": 1}),
                json!({"btr": 20.5, "status": 3, "count": 10}),
            ],
        );
    let (ctx, _) = context_for(&site).await;

    let result = TreasureBoxTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "unboxed 10 items, 20.5 BTR");
    assert_eq!(site.hits("GET", "/api/mining-gala/result/b-7"), 3);
    assert_eq!(site.hits("POST", "/me/login"), 1);
}

#[tokio::test]
async fn test_treasure_box_status_checks_are_bounded() {
    let site = MockSite::new()
        .route("GET", "/api/mining-gala/box", vec![json!({"box_id": "b-8", "count": 1})])
        .route("GET", "/api/mining-gala/result/b-8", vec![json!({"status": 1})]);
    let (ctx, _) = context_for(&site).await;
    let checks = ctx.config.modules.box_status_checks as usize;

    let result = TreasureBoxTask.run(ctx).await.unwrap();

    assert!(!result.success);
    assert!(!result.skipped);
    assert!(result.message.contains("not unboxed"));
    assert_eq!(site.hits("GET", "/api/mining-gala/result/b-8"), checks);
}

#[tokio::test]
async fn test_treasure_box_without_boxes_is_skipped() {
    let site = MockSite::new().route("GET", "/api/mining-gala/box", vec![Value::Null]);
    let (ctx, _) = context_for(&site).await;

    let result = TreasureBoxTask.run(ctx).await.unwrap();

    assert!(result.skipped);
    assert_eq!(result.message, "no free boxes");
    assert!(site
        .requests()
        .iter()
        .all(|r| !r.path.starts_with("/api/mining-gala/result")));
}

#[tokio::test]
async fn test_assemble_car_builds_until_declined() {
    let site = MockSite::new()
        .route("POST", "/api/raffle/assemble", vec![ok(), ok(), declined()])
        .route("GET", "/assemble-cars", vec![garage()]);
    let (ctx, _) = context_for(&site).await;

    let result = AssembleCarTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "assembled 2 car(s)");

    // declined stays scripted, so ratings 2 and 3 each stop after one try
    let ratings: Vec<Value> = site
        .requests()
        .into_iter()
        .filter(|r| r.path == "/api/raffle/assemble")
        .map(|r| r.body["starRating"].clone())
        .collect();
    assert_eq!(ratings, vec![json!(1), json!(1), json!(1), json!(2), json!(3)]);
    assert_eq!(site.hits("GET", "/assemble-cars"), 1);
}

#[tokio::test]
async fn test_assemble_car_without_parts_is_skipped() {
    let site = MockSite::new()
        .route("POST", "/api/raffle/assemble", vec![declined()])
        .route("GET", "/assemble-cars", vec![garage()]);
    let (ctx, _) = context_for(&site).await;

    let result = AssembleCarTask.run(ctx).await.unwrap();

    assert!(result.skipped);
    assert_eq!(site.hits("POST", "/api/raffle/assemble"), 3);
}

#[tokio::test]
async fn test_lucky_draw_assembles_cars_after_prize() {
    let site = MockSite::new()
        .route("GET", "/api/draw/info", vec![json!({"chances": 1})])
        .route(
            "GET",
            "/api/draw/pre",
            vec![json!({"lottery_id": "lot-1", "expire_time": 1718000000})],
        )
        .route(
            "GET",
            "/api/draw/reply/lot-1",
            vec![json!({"lottery_type": 1, "value": 20})],
        )
        .route("POST", "/api/raffle/assemble", vec![ok(), declined()])
        .route("GET", "/assemble-cars", vec![garage()]);
    let (ctx, pacer) = context_for(&site).await;

    let result = LuckyDrawTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("won 20 points"));
    assert_eq!(pacer.count(), 1);
    assert_eq!(site.hits("POST", "/api/raffle/assemble"), 4);
    assert_eq!(site.hits("GET", "/assemble-cars"), 1);
}

#[tokio::test]
async fn test_lucky_draw_survives_assembly_failure() {
    let site = MockSite::new()
        .route("GET", "/api/draw/info", vec![json!({"chances": 1})])
        .route(
            "GET",
            "/api/draw/pre",
            vec![json!({"lottery_id": "lot-2", "expire_time": 1718000000})],
        )
        .route(
            "GET",
            "/api/draw/reply/lot-2",
            vec![json!({"lottery_type": 0, "value": "0.5"})],
        );
    let (ctx, _) = context_for(&site).await;

    let result = LuckyDrawTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("won 0.5$ in BTC"));
}

#[tokio::test]
async fn test_btcfi_daily_check_claims_order() {
    let site = MockSite::new()
        .route("GET", "/api/btcfi/daily-check", vec![json!({"success": true})])
        .route(
            "GET",
            "/api/btcfi/claim-order",
            vec![json!({"success": true, "data": {"orderId": 4411}})],
        );
    let (ctx, pacer) = context_for(&site).await;

    let result = BtcfiDailyCheckTask.run(ctx).await.unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "daily check order 4411");
    assert_eq!(pacer.count(), 1);
}

#[tokio::test]
async fn test_btcfi_rejected_check_is_an_error() {
    let site = MockSite::new()
        .route("GET", "/api/btcfi/daily-check", vec![json!({"success": false})]);
    let (ctx, _) = context_for(&site).await;

    let err = BtcfiDailyCheckTask.run(ctx).await.unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to start daily check"));
    assert_eq!(site.hits("GET", "/api/btcfi/claim-order"), 0);
}

#[tokio::test]
async fn test_btc_price_from_ticker() {
    let site = MockSite::new()
        .route("GET", "/ticker", vec![json!({"symbol": "BTCUSDT", "price": "61234.50"})]);
    let base_url = site.serve().await;

    let price = btc_usd_price(&format!("{}/ticker", base_url)).await.unwrap();
    assert_eq!(price, 61234.5);

    assert!(btc_usd_price(&format!("{}/missing", base_url)).await.is_err());
}
