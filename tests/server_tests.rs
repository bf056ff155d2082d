use std::time::Duration;

use serde_json::{Value, json};
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use trade_engine::{
    api::{ACCOUNT_HEADER, OrderAck, router},
    config::EngineConfig,
    state::AppState,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_server_matches_orders_in_background() {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        tick_interval: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let state = AppState::open(dir.path(), config).unwrap();

    let token = CancellationToken::new();
    let scheduler = state.engine.start(token.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = token.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let mut ids = Vec::new();
    for (account, side, price) in [("alice", "BUY", 101), ("bob", "SELL", 99)] {
        let res = client
            .post(format!("{base}/orders"))
            .header(ACCOUNT_HEADER, account)
            .json(&json!({
                "symbol": "ETH-USD",
                "side": side,
                "price": price,
                "quantity": 3
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
        ids.push(res.json::<OrderAck>().await.unwrap().order_id);
    }

    let trades = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let v: Value = client
                .get(format!("{base}/trades?symbol=ETH-USD"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let trades = v["trades"].as_array().cloned().unwrap_or_default();
            if !trades.is_empty() {
                return trades;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("orders were not matched in time");

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "101");
    assert_eq!(trades[0]["quantity"], 3);

    for id in ids {
        let o: Value = client
            .get(format!("{base}/orders/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(o["status"], "Filled");
    }

    token.cancel();
    scheduler.stop().await;
    server.await.unwrap();
}
