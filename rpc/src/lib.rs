//! JSON-RPC server for the Agora node.
//!
//! Exposes the wallet write commands (delegate, committee, bill, name and
//! token operations) and the ledger queries over a single `POST /`
//! endpoint, plus Prometheus metrics at `GET /metrics`.

pub mod error;
pub mod handlers;
pub mod params;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcRequest, RpcResponse, RpcServer, RpcState};
