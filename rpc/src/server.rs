//! Axum-based RPC server.
//!
//! `POST /` takes a JSON-RPC request `{ "method", "params", "id" }` with
//! positional params. `GET /metrics` serves the Prometheus text format when
//! metrics are enabled.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use agora_node::{AgoraNode, BalanceSheet, NodeMetrics, ShutdownSignal, SubmissionPipeline};
use agora_operations::TransactionBuilder;
use agora_store::LedgerStore;

use crate::error::RpcError;
use crate::handlers::{self, WRITE_METHODS};
use crate::params::Params;

/// Everything a request handler reads from or writes through.
pub struct RpcState<S: LedgerStore, B> {
    store: Arc<S>,
    pipeline: SubmissionPipeline<S, BalanceSheet, B>,
    metrics: Option<Arc<NodeMetrics>>,
}

impl<S, B> RpcState<S, B>
where
    S: LedgerStore + 'static,
    B: TransactionBuilder,
{
    /// Serve `node`, broadcasting write commands through `builder`.
    pub fn new(node: &AgoraNode<S>, builder: Arc<B>) -> Self {
        Self {
            store: Arc::clone(node.store()),
            pipeline: node.pipeline(builder),
            metrics: node
                .config()
                .enable_metrics
                .then(|| Arc::clone(node.metrics())),
        }
    }

    /// Dispatch one method call.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let params = Params::new(params);
        if WRITE_METHODS.contains(&method) {
            handlers::write(&self.pipeline, method, &params).await
        } else {
            handlers::query(self.store.as_ref(), method, &params)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
    pub id: Value,
}

impl RpcResponse {
    fn new(id: Value, outcome: Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(result) => Self {
                jsonrpc: "2.0",
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => Self {
                jsonrpc: "2.0",
                result: None,
                error: Some(RpcErrorBody {
                    code: e.code(),
                    message: e.to_string(),
                }),
                id,
            },
        }
    }
}

/// Build the router over `state`.
pub fn router<S, B>(state: Arc<RpcState<S, B>>) -> Router
where
    S: LedgerStore + 'static,
    B: TransactionBuilder + 'static,
{
    Router::new()
        .route("/", post(handle_rpc::<S, B>))
        .route("/metrics", get(handle_metrics::<S, B>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_rpc<S, B>(State(state): State<Arc<RpcState<S, B>>>, body: Bytes) -> Json<RpcResponse>
where
    S: LedgerStore + 'static,
    B: TransactionBuilder + 'static,
{
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return Json(RpcResponse::new(Value::Null, Err(RpcError::Parse(e.to_string())))),
    };
    let outcome = match &request.params {
        Value::Array(params) => state.call(&request.method, params).await,
        Value::Null => state.call(&request.method, &[]).await,
        _ => Err(RpcError::InvalidRequest("params must be an array".into())),
    };
    if let Err(e) = &outcome {
        debug!(method = %request.method, code = e.code(), error = %e, "rpc call failed");
    }
    Json(RpcResponse::new(request.id, outcome))
}

async fn handle_metrics<S, B>(State(state): State<Arc<RpcState<S, B>>>) -> Response
where
    S: LedgerStore + 'static,
    B: TransactionBuilder + 'static,
{
    match &state.metrics {
        Some(metrics) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.encode(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

pub struct RpcServer {
    pub port: u16,
}

impl RpcServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Serve on localhost until `shutdown` fires.
    pub async fn start<S, B>(
        &self,
        state: Arc<RpcState<S, B>>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), RpcError>
    where
        S: LedgerStore + 'static,
        B: TransactionBuilder + 'static,
    {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        info!(%addr, "RPC server listening");
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("RPC server stopped");
        Ok(())
    }
}
