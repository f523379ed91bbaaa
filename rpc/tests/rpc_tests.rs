//! Requests through the router, against a node over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use agora_ledger::ConfirmedBlock;
use agora_node::{AgoraNode, ChainUpdate, NodeConfig, SyncDriver};
use agora_nullables::{NullStore, NullTxBuilder};
use agora_rpc::{router, RpcState};
use agora_types::{KeyId, Timestamp};
use agora_utils::describe_window;

const A: KeyId = KeyId::new([0xA0; 20]);
const B: KeyId = KeyId::new([0xB0; 20]);

struct Fixture {
    app: Router,
    driver: SyncDriver<NullStore>,
    builder: Arc<NullTxBuilder>,
    t0: u64,
    height: u64,
    confirmed: usize,
    _node: AgoraNode<NullStore>,
}

impl Fixture {
    fn new() -> Self {
        let config = NodeConfig {
            enable_metrics: true,
            ..NodeConfig::default()
        };
        let mut node = AgoraNode::with_store(config, Arc::new(NullStore::new())).unwrap();
        let driver = node.sync_driver();
        let builder = Arc::new(NullTxBuilder::new());
        let state = Arc::new(RpcState::new(&node, Arc::clone(&builder)));
        Self {
            app: router(state),
            driver,
            builder,
            t0: Timestamp::now().as_secs(),
            height: 0,
            confirmed: 0,
            _node: node,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Value {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        self.post(body.to_string()).await
    }

    async fn post(&self, body: String) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn mine(&mut self, offset: u64, balances: &[(KeyId, u64)]) {
        self.height += 1;
        let mut block = ConfirmedBlock::new(self.height, Timestamp::new(self.t0 + offset));
        let submitted = self.builder.submitted();
        for tx in submitted.iter().skip(self.confirmed) {
            block = block.with_tx(tx.payload.clone(), tx.from, tx.fee);
        }
        self.confirmed = submitted.len();
        let mut update = ChainUpdate::new(block);
        update.balances = balances.to_vec();
        self.driver.apply(update).await.unwrap();
    }
}

fn error_code(response: &Value) -> i64 {
    response["error"]["code"].as_i64().unwrap()
}

#[tokio::test]
async fn unknown_method_and_bad_json() {
    let f = Fixture::new();
    assert_eq!(error_code(&f.call("getblock", json!([])).await), -32601);
    assert_eq!(error_code(&f.post("{not json".into()).await), -32700);
    assert_eq!(error_code(&f.call("listbills", json!({ "a": 1 })).await), -32600);
}

#[tokio::test]
async fn committee_vote_flow() {
    let mut f = Fixture::new();

    let registered = f
        .call("registercommittee", json!([A.to_hex(), "alpha", "http://a"]))
        .await;
    assert_eq!(registered["result"].as_str().unwrap().len(), 64);
    f.mine(0, &[(B, 500)]).await;

    let committee = f.call("getcommittee", json!([A.to_hex()])).await;
    assert_eq!(
        committee["result"],
        json!({ "address": A.to_hex(), "name": "alpha", "url": "http://a", "votes": 0 })
    );

    f.call("votecommittee", json!([B.to_hex(), "alpha"])).await;
    f.mine(600, &[]).await;
    let committee = f.call("getcommittee", json!([A.to_hex()])).await;
    assert_eq!(committee["result"]["votes"], 500);

    let again = f.call("votecommittee", json!([B.to_hex(), A.to_hex()])).await;
    assert_eq!(error_code(&again), -26);
    assert!(again["error"]["message"]
        .as_str()
        .unwrap()
        .contains("already voted"));

    let voters = f.call("listcommitteevoters", json!([A.to_hex()])).await;
    assert_eq!(voters["result"], json!([{ "address": B.to_hex(), "votes": 500 }]));
}

#[tokio::test]
async fn submitted_bill_is_readable() {
    let mut f = Fixture::new();
    f.call("registercommittee", json!([A.to_hex(), "alpha", "http://a"]))
        .await;
    f.mine(0, &[(B, 10)]).await;

    let submitted = f
        .call("submitbill", json!([A.to_hex(), "t1", "d", "u", 1, "yes", "no"]))
        .await;
    let bill = submitted["result"]["billid"].as_str().unwrap().to_string();
    assert_eq!(bill, agora_crypto::bill_id("t1").to_string());
    f.mine(600, &[]).await;

    f.call("votebill", json!([B.to_hex(), bill, 0])).await;
    f.mine(1_200, &[]).await;

    let info = f.call("getbill", json!([bill])).await;
    let state = &info["result"]["state"];
    assert_eq!(state["option_totals"], json!([10, 0]));
    assert_eq!(state["finished"], false);
    assert_eq!(info["result"]["options"], json!(["yes", "no"]));

    let voted = f.call("listvoterbills", json!([B.to_hex()])).await;
    assert_eq!(voted["result"], json!([{ "bill": bill, "option": 0 }]));
}

#[tokio::test]
async fn parameter_errors_carry_codes() {
    let f = Fixture::new();
    assert_eq!(error_code(&f.call("getcommittee", json!(["zz"])).await), -5);
    assert_eq!(error_code(&f.call("getcoindistribution", json!([])).await), -8);
    assert_eq!(error_code(&f.call("getdelegatevotes", json!(["nobody"])).await), -5);
    assert_eq!(error_code(&f.call("vote", json!([A.to_hex(), "nobody"])).await), -5);
    assert_eq!(error_code(&f.call("register", json!([A.to_hex()])).await), -8);
}

#[tokio::test]
async fn missing_records_are_null() {
    let f = Fixture::new();
    assert_eq!(f.call("getcommittee", json!([A.to_hex()])).await["result"], Value::Null);
    assert_eq!(f.call("getaddressname", json!([A.to_hex()])).await["result"], Value::Null);
    assert_eq!(f.call("listbills", json!([])).await["result"], json!([]));
}

#[tokio::test]
async fn names_and_balances() {
    let mut f = Fixture::new();
    f.call("registername", json!([A.to_hex(), "alice"])).await;
    f.mine(0, &[(A, 30), (B, 70)]).await;

    assert_eq!(f.call("getnameaddress", json!(["alice"])).await["result"], A.to_hex());
    assert_eq!(f.call("getaddressname", json!([A.to_hex()])).await["result"], "alice");
    assert_eq!(f.call("getaddressbalance", json!([B.to_hex()])).await["result"], 70);

    let rank = f.call("getcoinrank", json!([1])).await;
    assert_eq!(rank["result"], json!([{ "address": B.to_hex(), "balance": 70 }]));

    let buckets = f.call("getcoindistribution", json!([10, 50])).await;
    assert_eq!(
        buckets["result"],
        json!([
            { "threshold": 10, "addresses": 1, "coins": 30 },
            { "threshold": 50, "addresses": 1, "coins": 70 },
        ])
    );
}

#[tokio::test]
async fn metrics_are_served() {
    let mut f = Fixture::new();
    f.mine(0, &[]).await;
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = f.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("agora_blocks_applied_total 1"));
}

#[tokio::test]
async fn queries_read_the_recorded_block() {
    let mut f = Fixture::new();
    f.call("registercommittee", json!([A.to_hex(), "alpha", "http://a"]))
        .await;
    f.mine(0, &[(B, 10)]).await;
    let submitted = f
        .call("submitbill", json!([A.to_hex(), "t2", "d", "u", 1, "yes", "no"]))
        .await;
    let bill = submitted["result"]["billid"].as_str().unwrap().to_string();
    f.mine(600, &[]).await;

    let end = Timestamp::new(f.t0 + 600 + 86_400);
    let info = f.call("getbill", json!([bill])).await;
    assert_eq!(info["result"]["end_time"], end.as_secs());
    assert_eq!(
        info["result"]["window"],
        describe_window(end, Timestamp::new(f.t0 + 600))
    );

    let stale = ChainUpdate::new(ConfirmedBlock::new(1, Timestamp::new(f.t0 + 700)))
        .with_balance(B, 999);
    assert!(f.driver.apply(stale).await.is_err());
    assert_eq!(f.call("getaddressbalance", json!([B.to_hex()])).await["result"], 10);
}
