//! End-to-end tests against the composed HTTP surface (§4.8), driven with
//! `warp::test::request` over `FakeLedgerAdapter` + an in-memory repository.

use coordinator::http::build_routes;
use coordinator::{AppState, CoordinatorConfig};
use ledger::{Account, FakeLedgerAdapter};
use primitive_types::U256;
use repository::InMemoryRepository;
use serde_json::{json, Value};
use std::sync::Arc;

async fn harness() -> (Arc<AppState>, Arc<FakeLedgerAdapter>) {
    let adapter = Arc::new(FakeLedgerAdapter::new());
    let repository = Arc::new(InMemoryRepository::in_memory_only());
    let mut config = CoordinatorConfig::default();
    config.data_dir = std::env::temp_dir().join("coordinator-http-test").to_string_lossy().to_string();
    config.settlement_delay_ms = 1;
    let state = AppState::new(adapter.clone() as _, repository, config);
    state.initialize().await.unwrap();
    (state, adapter)
}

async fn seeded_pool(state: &Arc<AppState>, adapter: &Arc<FakeLedgerAdapter>) -> (Account, Account, String) {
    let token_a = Account("tokenA".into());
    let token_b = Account("tokenB".into());
    let creator = Account("creator".into());
    let pool = state.pool_manager.create_pool(&token_a, &token_b, &creator).await.unwrap();

    adapter.credit(&pool.pool_address, &token_a, U256::from(1_000_000_000_000u64));
    adapter.credit(&pool.pool_address, &token_b, U256::from(2_000_000_000_000u64));
    let mut tx = adapter.new_transaction();
    tx.update_permissions(pool.pool_address.clone(), ledger::Permission::SendOnBehalf, true, None);
    adapter.publish(tx).await.unwrap();

    (token_a, token_b, pool.pool_address.address().to_string())
}

#[tokio::test]
async fn list_pools_and_stats_round_trip() {
    let (state, adapter) = harness().await;
    let (_, _, pool_address) = seeded_pool(&state, &adapter).await;
    let routes = build_routes(state);

    let resp = warp::test::request().path("/pools").reply(&routes).await;
    assert_eq!(resp.status(), 200);
    let body: Vec<Value> = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body.len(), 1);

    let resp = warp::test::request()
        .path(&format!("/pools/{pool_address}/stats"))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["reserveA"], "1000000000000");
}

#[tokio::test]
async fn quote_then_swap_execute_settles_both_legs() {
    let (state, adapter) = harness().await;
    let (token_a, token_b, _) = seeded_pool(&state, &adapter).await;
    let routes = build_routes(state);

    let quote_resp = warp::test::request()
        .method("POST")
        .path("/quote")
        .json(&json!({
            "tokenIn": token_a.address(),
            "tokenOut": token_b.address(),
            "amountIn": "10000000000",
        }))
        .reply(&routes)
        .await;
    assert_eq!(quote_resp.status(), 200);
    let quote: Value = serde_json::from_slice(quote_resp.body()).unwrap();
    let amount_out = quote["amountOut"].as_str().unwrap().to_string();

    let swap_resp = warp::test::request()
        .method("POST")
        .path("/swap/execute")
        .json(&json!({
            "userSeed": "user1",
            "tokenIn": token_a.address(),
            "tokenOut": token_b.address(),
            "amountIn": "10000000000",
            "minAmountOut": "1",
        }))
        .reply(&routes)
        .await;
    assert_eq!(swap_resp.status(), 200);
    let swap: Value = serde_json::from_slice(swap_resp.body()).unwrap();
    assert_eq!(swap["amountOut"], amount_out);
}

#[tokio::test]
async fn quote_for_unknown_pair_is_404() {
    let (state, _adapter) = harness().await;
    let routes = build_routes(state);

    let resp = warp::test::request()
        .method("POST")
        .path("/quote")
        .json(&json!({ "tokenIn": "tokenX", "tokenOut": "tokenY", "amountIn": "1" }))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body["message"].as_str().unwrap().contains("pool not found"));
}

#[tokio::test]
async fn negative_amount_is_rejected_as_bad_request() {
    let (state, adapter) = harness().await;
    let (token_a, token_b, _) = seeded_pool(&state, &adapter).await;
    let routes = build_routes(state);

    let resp = warp::test::request()
        .method("POST")
        .path("/quote")
        .json(&json!({ "tokenIn": token_a.address(), "tokenOut": token_b.address(), "amountIn": "-5" }))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn anchor_pool_create_update_fee_and_unauthorized_caller() {
    let (state, _adapter) = harness().await;
    let routes = build_routes(state);

    let create_resp = warp::test::request()
        .method("POST")
        .path("/anchor-pools/create")
        .json(&json!({
            "tokenA": "tokenA",
            "tokenB": "tokenB",
            "creator": "creator1",
            "feeBps": 25,
        }))
        .reply(&routes)
        .await;
    assert_eq!(create_resp.status(), 200);
    let created: Value = serde_json::from_slice(create_resp.body()).unwrap();
    let pool_address = created["poolAddress"].as_str().unwrap().to_string();
    assert_eq!(created["feeBps"], 25);

    let update_resp = warp::test::request()
        .method("POST")
        .path("/anchor-pools/update-fee")
        .json(&json!({ "poolAddress": pool_address, "caller": "someone-else", "newFeeBps": 50 }))
        .reply(&routes)
        .await;
    assert_eq!(update_resp.status(), 403);

    let update_resp = warp::test::request()
        .method("POST")
        .path("/anchor-pools/update-fee")
        .json(&json!({ "poolAddress": pool_address, "caller": "creator1", "newFeeBps": 50 }))
        .reply(&routes)
        .await;
    assert_eq!(update_resp.status(), 200);
    let updated: Value = serde_json::from_slice(update_resp.body()).unwrap();
    assert_eq!(updated["feeBps"], 50);
}

#[tokio::test]
async fn liquidity_add_with_user_address_requires_keythings_handoff() {
    let (state, _adapter) = harness().await;
    let routes = build_routes(state);

    let resp = warp::test::request()
        .method("POST")
        .path("/liquidity/add")
        .json(&json!({
            "tokenA": "tokenA",
            "tokenB": "tokenB",
            "amountADesired": "1000",
            "amountBDesired": "2000",
            "aMin": "0",
            "bMin": "0",
            "creator": "creator1",
            "userAddress": "user1",
        }))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["requiresKeythingsLiquidity"], true);
    assert!(body["poolAddress"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn health_check_is_ok() {
    let (state, _adapter) = harness().await;
    let routes = build_routes(state);
    let resp = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(resp.status(), 200);
}
