//! The outbox: where submitted payloads wait for the external wallet.
//!
//! Each request from the submission pipeline is appended to the outbox file
//! as one JSON line. The wallet that owns the coins picks lines up, builds
//! and signs the transaction, and broadcasts it. The id returned to the RPC
//! caller is the outbox request id, a Blake2b hash over the request.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use agora_crypto::blake2b_256_multi;
use agora_node::{OutboundTx, ShutdownSignal};
use agora_operations::BuildError;
use agora_types::TxHash;

#[derive(Debug, Serialize)]
struct OutboxLine {
    id: String,
    payload: String,
    fee: u64,
    from: String,
}

fn request_id(seq: u64, request: &OutboundTx) -> TxHash {
    TxHash::new(blake2b_256_multi(&[
        &seq.to_le_bytes(),
        request.from.as_bytes(),
        &request.fee.to_le_bytes(),
        &request.payload,
    ]))
}

/// Append every request to `path` until shutdown or the pipeline goes away.
pub async fn run(
    path: PathBuf,
    mut requests: mpsc::Receiver<OutboundTx>,
    mut shutdown: ShutdownSignal,
) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("opening outbox {}", path.display()))?;
    info!(path = %path.display(), "outbox open");

    let mut seq = 0u64;
    loop {
        let request = tokio::select! {
            _ = shutdown.wait() => return Ok(()),
            request = requests.recv() => match request {
                Some(request) => request,
                None => return Ok(()),
            },
        };
        seq += 1;
        let id = request_id(seq, &request);
        let line = OutboxLine {
            id: id.to_string(),
            payload: hex::encode(&request.payload),
            fee: request.fee,
            from: request.from.to_hex(),
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        match file.write_all(&bytes).await {
            Ok(()) => {
                file.flush().await?;
                request.respond(Ok(id));
            }
            Err(e) => {
                warn!(error = %e, "outbox write failed");
                request.respond(Err(BuildError::Unavailable(format!("outbox write failed: {e}"))));
            }
        }
    }
}

/// Refuse every request: the node was started without an outbox.
pub async fn refuse(mut requests: mpsc::Receiver<OutboundTx>, mut shutdown: ShutdownSignal) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => return,
            request = requests.recv() => match request {
                Some(request) => request.respond(Err(BuildError::Unavailable(
                    "no outbox configured; start the node with --outbox".into(),
                ))),
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_node::{ChannelTxBuilder, ShutdownController};
    use agora_operations::TransactionBuilder;
    use agora_types::KeyId;

    #[tokio::test]
    async fn requests_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let (builder, rx) = ChannelTxBuilder::channel(4);
        let controller = ShutdownController::new();
        let task = tokio::spawn(run(path.clone(), rx, controller.subscribe()));

        let first = builder.submit(vec![0xc3, 0x01], 7, KeyId::new([0xA0; 20])).await.unwrap();
        let second = builder.submit(vec![0xc3, 0x01], 7, KeyId::new([0xA0; 20])).await.unwrap();
        assert_ne!(first, second);

        drop(builder);
        task.await.unwrap().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["payload"], "c301");
        assert_eq!(lines[0]["fee"], 7);
        assert_eq!(lines[0]["id"], first.to_string());
    }

    #[tokio::test]
    async fn refusing_outbox_answers_unavailable() {
        let (builder, rx) = ChannelTxBuilder::channel(1);
        let controller = ShutdownController::new();
        tokio::spawn(refuse(rx, controller.subscribe()));
        assert!(matches!(
            builder.submit(vec![1], 0, KeyId::ZERO).await,
            Err(BuildError::Unavailable(_))
        ));
    }
}
