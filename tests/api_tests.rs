use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;

use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt;
use trade_engine::{
    api::{ACCOUNT_HEADER, OrderAck, router},
    config::EngineConfig,
    state::AppState,
};

fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        wake_on_order: false,
        ..EngineConfig::default()
    };
    let state = AppState::open(dir.path(), config).unwrap();
    (router(state.clone()), state, dir)
}

async fn body_json(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(res: Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_order(account: Option<&str>, body: &Value) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json");
    if let Some(account) = account {
        req = req.header(ACCOUNT_HEADER, account);
    }
    req.body(Body::from(body.to_string())).unwrap()
}

fn order(side: &str, price: Value, quantity: u64) -> Value {
    json!({
        "symbol": "BTC-USD",
        "side": side,
        "price": price,
        "quantity": quantity
    })
}

#[tokio::test]
async fn create_order_rejects_zero_qty() {
    let (app, _state, _tmp) = test_app();

    let res = app
        .oneshot(post_order(Some("alice"), &order("BUY", json!(50), 0)))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["error"], "quantity must be > 0");
}

#[tokio::test]
async fn create_order_rejects_negative_qty_as_bad_request() {
    let (app, state, _tmp) = test_app();

    let body = json!({
        "symbol": "BTC-USD",
        "side": "SELL",
        "price": 50,
        "quantity": -1
    });
    let res = app.oneshot(post_order(Some("alice"), &body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["error"], "quantity must be > 0");
    assert_eq!(state.engine.store().pending_count("BTC-USD"), 0);
}

#[tokio::test]
async fn create_order_rejects_non_positive_price() {
    let (app, state, _tmp) = test_app();

    for price in [json!(-50), json!(0), json!("0.00")] {
        let res = app
            .clone()
            .oneshot(post_order(Some("alice"), &order("SELL", price, 1)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let v = body_json(res).await;
        assert_eq!(v["error"], "price must be > 0");
    }
    assert_eq!(state.engine.store().pending_count("BTC-USD"), 0);
}

#[tokio::test]
async fn create_order_rejects_unknown_side() {
    let (app, _state, _tmp) = test_app();
    let res = app
        .oneshot(post_order(Some("alice"), &order("HOLD", json!(50), 1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_requires_account_header() {
    let (app, _state, _tmp) = test_app();
    let res = app
        .oneshot(post_order(None, &order("BUY", json!(50), 1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains(ACCOUNT_HEADER));
}

#[tokio::test]
async fn create_order_unsupported_symbol_is_bad_request() {
    let (app, _state, _tmp) = test_app();
    let body = json!({
        "symbol": "BTC-LOL",
        "side": "buy",
        "price": 50,
        "quantity": 1
    });
    let res = app.oneshot(post_order(Some("alice"), &body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains("unsupported symbol"));
}

#[tokio::test]
async fn limit_order_rests_and_is_queryable() {
    let (app, _state, _tmp) = test_app();

    let res = app
        .clone()
        .oneshot(post_order(Some("alice"), &order("buy", json!(48), 10)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let ack: OrderAck = json(res).await;

    let res = app
        .clone()
        .oneshot(get("/orderbook?symbol=BTC-USD"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snap = body_json(res).await;
    assert_eq!(snap["symbol"], "BTC-USD");
    assert_eq!(snap["bids"][0]["price"], "48");
    assert_eq!(snap["bids"][0]["quantity"], 10);
    assert!(snap["asks"].as_array().unwrap().is_empty());

    let res = app
        .oneshot(get(&format!("/orders/{}", ack.order_id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let o = body_json(res).await;
    assert_eq!(o["account_id"], "alice");
    assert_eq!(o["status"], "Pending");
    assert_eq!(o["remaining"], 10);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let (app, _state, _tmp) = test_app();
    let res = app
        .oneshot(get(&format!("/orders/{}", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_endpoints_require_symbol() {
    let (app, _state, _tmp) = test_app();
    for uri in ["/orderbook", "/trades", "/kline?interval=1m", "/trades?symbol="] {
        let res = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn unknown_symbol_reads_are_empty() {
    let (app, _state, _tmp) = test_app();

    let res = app
        .clone()
        .oneshot(get("/orderbook?symbol=FOO-BAR"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snap = body_json(res).await;
    assert!(snap["bids"].as_array().unwrap().is_empty());

    let res = app.oneshot(get("/trades?symbol=FOO-BAR")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert!(v["trades"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn kline_rejects_bad_interval_and_zero_limit() {
    let (app, _state, _tmp) = test_app();

    let res = app
        .clone()
        .oneshot(get("/kline?symbol=BTC-USD&interval=7m"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains("7m"));

    let res = app
        .clone()
        .oneshot(get("/kline?symbol=BTC-USD"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get("/kline?symbol=BTC-USD&interval=1m&limit=0"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn matched_orders_show_up_in_trades_and_klines() {
    let (app, state, _tmp) = test_app();

    let buy = app
        .clone()
        .oneshot(post_order(Some("alice"), &order("BUY", json!(60000), 1)))
        .await
        .unwrap();
    let buy: OrderAck = json(buy).await;
    let sell = app
        .clone()
        .oneshot(post_order(Some("bob"), &order("SELL", json!(50000), 1)))
        .await
        .unwrap();
    let sell: OrderAck = json(sell).await;

    let report = state.engine.run_tick();
    assert_eq!(report.trades, 1);

    let res = app
        .clone()
        .oneshot(get("/trades?symbol=BTC-USD"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    let trades = v["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "60000");
    assert_eq!(trades[0]["buy_order_id"], buy.order_id.to_string());
    assert_eq!(trades[0]["sell_order_id"], sell.order_id.to_string());

    let res = app
        .clone()
        .oneshot(get("/kline?symbol=BTC-USD&interval=1h&limit=5"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let candles = body_json(res).await;
    assert_eq!(candles.as_array().unwrap().len(), 1);
    assert_eq!(candles[0]["interval"], "1h");
    assert_eq!(candles[0]["volume"], 1);

    let res = app
        .oneshot(get(&format!("/orders/{}", sell.order_id)))
        .await
        .unwrap();
    let o = body_json(res).await;
    assert_eq!(o["status"], "Filled");
    assert_eq!(o["remaining"], 0);
}

#[tokio::test]
async fn pairs_endpoint_lists_directory() {
    let (app, _state, _tmp) = test_app();
    let res = app.oneshot(get("/pairs")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    let pairs = v.as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0]["symbol"], "BTC-USD");
    assert_eq!(pairs[0]["is_active"], true);
}
