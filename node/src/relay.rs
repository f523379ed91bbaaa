//! A transaction builder that hands payloads to another task.
//!
//! The wallet side (coin selection, signing, broadcast) runs elsewhere and
//! receives [`OutboundTx`] requests over a bounded channel, answering each
//! with the id of the transaction it built.

use agora_operations::{BuildError, TransactionBuilder};
use agora_types::{KeyId, TxHash};
use tokio::sync::{mpsc, oneshot};

/// A payload waiting to be wrapped into a chain transaction.
#[derive(Debug)]
pub struct OutboundTx {
    pub payload: Vec<u8>,
    pub fee: u64,
    pub from: KeyId,
    pub reply: oneshot::Sender<Result<TxHash, BuildError>>,
}

impl OutboundTx {
    /// Answer the submitter. A submitter that gave up is ignored.
    pub fn respond(self, result: Result<TxHash, BuildError>) {
        let _ = self.reply.send(result);
    }
}

#[derive(Clone)]
pub struct ChannelTxBuilder {
    tx: mpsc::Sender<OutboundTx>,
}

impl ChannelTxBuilder {
    /// A builder and the receiving end the wallet task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundTx>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TransactionBuilder for ChannelTxBuilder {
    async fn submit(&self, payload: Vec<u8>, fee: u64, from: KeyId) -> Result<TxHash, BuildError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(OutboundTx {
                payload,
                fee,
                from,
                reply,
            })
            .await
            .map_err(|_| BuildError::Unavailable("wallet relay stopped".into()))?;
        answer
            .await
            .map_err(|_| BuildError::Unavailable("wallet relay dropped the request".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_is_answered_by_the_wallet_task() {
        let (builder, mut rx) = ChannelTxBuilder::channel(4);
        let wallet = tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            assert_eq!(request.payload, vec![0xc8, 1]);
            assert_eq!(request.fee, 7);
            request.respond(Ok(TxHash::new([9; 32])));
        });

        let txid = builder
            .submit(vec![0xc8, 1], 7, KeyId::new([1; 20]))
            .await
            .unwrap();
        assert_eq!(txid, TxHash::new([9; 32]));
        wallet.await.unwrap();
    }

    #[tokio::test]
    async fn closed_relay_is_unavailable() {
        let (builder, rx) = ChannelTxBuilder::channel(1);
        drop(rx);
        assert!(matches!(
            builder.submit(vec![1], 0, KeyId::ZERO).await,
            Err(BuildError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn dropped_request_is_unavailable() {
        let (builder, mut rx) = ChannelTxBuilder::channel(1);
        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            drop(request);
        });
        assert!(matches!(
            builder.submit(vec![1], 0, KeyId::ZERO).await,
            Err(BuildError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn wallet_errors_pass_through() {
        let (builder, mut rx) = ChannelTxBuilder::channel(1);
        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            request.respond(Err(BuildError::Rejected("dust".into())));
        });
        assert_eq!(
            builder.submit(vec![1], 0, KeyId::ZERO).await,
            Err(BuildError::Rejected("dust".into()))
        );
    }
}
