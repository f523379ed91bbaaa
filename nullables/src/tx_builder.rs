//! Nullable transaction builder: record payloads instead of broadcasting them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use agora_operations::{BuildError, TransactionBuilder};
use agora_types::{KeyId, TxHash};

/// A transaction handed to the builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTx {
    pub payload: Vec<u8>,
    pub fee: u64,
    pub from: KeyId,
    pub hash: TxHash,
}

/// A test builder that records submissions and returns sequential hashes.
#[derive(Default)]
pub struct NullTxBuilder {
    submitted: Mutex<Vec<SubmittedTx>>,
    failure: Mutex<Option<BuildError>>,
    stalled: AtomicBool,
}

impl NullTxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every later submission with `error`.
    pub fn fail_with(&self, error: BuildError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Never complete later submissions.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// All transactions "broadcast" so far.
    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, payload: Vec<u8>, fee: u64, from: KeyId) -> Result<TxHash, BuildError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        let mut submitted = self.submitted.lock().unwrap();
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&(submitted.len() as u64 + 1).to_be_bytes());
        let hash = TxHash::new(bytes);
        submitted.push(SubmittedTx {
            payload,
            fee,
            from,
            hash,
        });
        Ok(hash)
    }
}

impl TransactionBuilder for NullTxBuilder {
    async fn submit(&self, payload: Vec<u8>, fee: u64, from: KeyId) -> Result<TxHash, BuildError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.record(payload, fee, from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::pin;
    use std::task::{Context, Poll, Waker};

    fn poll_once<F: Future>(fut: F) -> Poll<F::Output> {
        let mut fut = pin!(fut);
        fut.as_mut().poll(&mut Context::from_waker(Waker::noop()))
    }

    #[test]
    fn records_in_order_with_distinct_hashes() {
        let builder = NullTxBuilder::new();
        let a = poll_once(builder.submit(vec![1], 10, KeyId::new([1; 20])));
        let b = poll_once(builder.submit(vec![2], 20, KeyId::new([2; 20])));
        let (Poll::Ready(Ok(a)), Poll::Ready(Ok(b))) = (a, b) else {
            panic!("submission did not complete");
        };
        assert_ne!(a, b);
        let sent = builder.submitted();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].fee, 20);
        assert_eq!(sent[0].hash, a);
    }

    #[test]
    fn configured_failure_is_returned() {
        let builder = NullTxBuilder::new();
        builder.fail_with(BuildError::InsufficientFunds("empty wallet".into()));
        assert!(matches!(
            poll_once(builder.submit(vec![1], 1, KeyId::ZERO)),
            Poll::Ready(Err(BuildError::InsufficientFunds(_)))
        ));
        assert!(builder.submitted().is_empty());
    }

    #[test]
    fn stalled_builder_stays_pending() {
        let builder = NullTxBuilder::new();
        builder.stall();
        assert!(poll_once(builder.submit(vec![1], 1, KeyId::ZERO)).is_pending());
    }
}
