//! The chain feed: confirmed blocks as newline-delimited JSON.
//!
//! One block per line, bytes and addresses in hex:
//!
//! ```text
//! {"height":7,"time":1700000000,"txs":[{"payload":"c3..","sender":"a0..","fee":0}],"balances":{"a0..":500}}
//! ```
//!
//! `balances` lists the post-block spendable balance of every address the
//! block touched. Transactions keep their order within the block.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use agora_ledger::ConfirmedBlock;
use agora_node::{ChainUpdate, ShutdownSignal};
use agora_types::{KeyId, Timestamp};

#[derive(Debug, Deserialize)]
struct FeedTx {
    payload: String,
    sender: String,
    #[serde(default)]
    fee: u64,
}

#[derive(Debug, Deserialize)]
struct FeedBlock {
    height: u64,
    time: u64,
    #[serde(default)]
    txs: Vec<FeedTx>,
    #[serde(default)]
    balances: BTreeMap<String, u64>,
}

/// Parse one feed line.
pub fn parse_line(line: &str) -> anyhow::Result<ChainUpdate> {
    let raw: FeedBlock = serde_json::from_str(line).context("malformed feed line")?;
    let mut block = ConfirmedBlock::new(raw.height, Timestamp::new(raw.time));
    for (i, tx) in raw.txs.into_iter().enumerate() {
        let payload = hex::decode(&tx.payload)
            .with_context(|| format!("block {} tx {i}: payload is not hex", raw.height))?;
        let sender = KeyId::from_str(&tx.sender)
            .map_err(|e| anyhow!("block {} tx {i}: {e}", raw.height))?;
        block = block.with_tx(payload, sender, tx.fee);
    }
    let mut update = ChainUpdate::new(block);
    for (address, amount) in raw.balances {
        let address =
            KeyId::from_str(&address).map_err(|e| anyhow!("block {}: {e}", raw.height))?;
        update = update.with_balance(address, amount);
    }
    Ok(update)
}

/// Read updates from `reader` into `sink` until end of input, shutdown, or
/// the sink closing. Blank lines are ignored; a malformed line is an error.
pub async fn pump<R>(
    reader: R,
    sink: mpsc::Sender<ChainUpdate>,
    mut shutdown: ShutdownSignal,
) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0u64;
    loop {
        let line = tokio::select! {
            _ = shutdown.wait() => break,
            line = lines.next_line() => line.context("reading chain feed")?,
        };
        let Some(line) = line else {
            info!(delivered, "chain feed ended");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let update = parse_line(&line)?;
        debug!(height = update.block.height, txs = update.block.txs.len(), "feed block");
        if sink.send(update).await.is_err() {
            warn!("chain sync stopped; feed abandoned");
            break;
        }
        delivered += 1;
    }
    Ok(delivered)
}

/// Read every update from `reader`.
pub async fn read_all<R>(reader: R) -> anyhow::Result<Vec<ChainUpdate>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut updates = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading chain feed")? {
        if !line.trim().is_empty() {
            updates.push(parse_line(&line)?);
        }
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_node::ShutdownController;

    const A: &str = "a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0";

    #[test]
    fn parses_block_with_txs_and_balances() {
        let line = format!(
            r#"{{"height":3,"time":1800,"txs":[{{"payload":"c301","sender":"{A}","fee":5}}],"balances":{{"{A}":40}}}}"#
        );
        let update = parse_line(&line).unwrap();
        assert_eq!(update.block.height, 3);
        assert_eq!(update.block.time, Timestamp::new(1800));
        assert_eq!(update.block.txs[0].payload, vec![0xc3, 0x01]);
        assert_eq!(update.block.txs[0].fee, 5);
        assert_eq!(update.balances, vec![(KeyId::new([0xA0; 20]), 40)]);
    }

    #[test]
    fn rejects_bad_hex() {
        let line = format!(r#"{{"height":1,"time":0,"txs":[{{"payload":"zz","sender":"{A}"}}]}}"#);
        assert!(parse_line(&line).is_err());
        assert!(parse_line(r#"{"height":1,"time":0,"balances":{"nothex":1}}"#).is_err());
    }

    #[tokio::test]
    async fn pump_skips_blank_lines_and_stops_at_end() {
        let input = "{\"height\":1,\"time\":0}\n\n{\"height\":2,\"time\":600}\n";
        let (tx, mut rx) = mpsc::channel(4);
        let controller = ShutdownController::new();
        let delivered = pump(input.as_bytes(), tx, controller.subscribe())
            .await
            .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(rx.recv().await.unwrap().block.height, 1);
        assert_eq!(rx.recv().await.unwrap().block.height, 2);
    }

    #[tokio::test]
    async fn read_all_collects_in_order() {
        let input = "{\"height\":4,\"time\":0}\n{\"height\":5,\"time\":1}";
        let updates = read_all(input.as_bytes()).await.unwrap();
        let heights: Vec<u64> = updates.iter().map(|u| u.block.height).collect();
        assert_eq!(heights, vec![4, 5]);
    }
}
