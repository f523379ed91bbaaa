//! The submission pipeline: from a wallet command to a broadcast payload.
//!
//! Every write command resolves its human inputs (delegate names, committee
//! names, token addresses, decimal amounts) against the current ledger,
//! validates the resulting operation at the next height, checks the sender
//! can pay the fee, encodes the payload and hands it to the transaction
//! builder under a timeout.
//!
//! Validation here is best effort. Other operations may confirm first, so
//! the applier validates again when the transaction is mined.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use agora_governance::validate;
use agora_operations::{
    encode, CreateToken, DelegateSet, LockToken, Operation, RegisterCommittee, RegisterDelegate,
    RegisterName, RevokeCommittee, SubmitBill, TransactionBuilder, TransferToken, VoteBill,
    VoteCommittee,
};
use agora_store::{BalanceOracle, ChainClock, LedgerStore, LedgerView, TokenRecord};
use agora_types::{parse_fixed_point, BillId, ChainContext, KeyId, ProtocolParams, TxHash};
use tracing::{debug, info};

use crate::{NodeError, NodeMetrics};

/// Default time a submission may wait on the transaction builder.
pub const DEFAULT_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns wallet commands into broadcast operation payloads.
pub struct SubmissionPipeline<S, O: ?Sized, B> {
    store: Arc<S>,
    oracle: Arc<O>,
    builder: Arc<B>,
    clock: Arc<dyn ChainClock>,
    params: ProtocolParams,
    timeout: Duration,
    metrics: Option<Arc<NodeMetrics>>,
}

impl<S, O, B> SubmissionPipeline<S, O, B>
where
    S: LedgerStore,
    O: BalanceOracle + ?Sized,
    B: TransactionBuilder,
{
    pub fn new(
        store: Arc<S>,
        oracle: Arc<O>,
        builder: Arc<B>,
        clock: Arc<dyn ChainClock>,
        params: ProtocolParams,
    ) -> Self {
        Self {
            store,
            oracle,
            builder,
            clock,
            params,
            timeout: DEFAULT_SUBMISSION_TIMEOUT,
            metrics: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// The position a new submission is validated at: one block past the tip.
    pub fn submission_context(&self) -> ChainContext {
        let tip = self.clock.tip();
        ChainContext::new(tip.height.saturating_add(1), tip.time)
    }

    // ── Delegates ───────────────────────────────────────────────────────

    pub async fn register_delegate(&self, from: KeyId, name: &str) -> Result<TxHash, NodeError> {
        let op = Operation::RegisterDelegate(RegisterDelegate {
            name: name.to_string(),
        });
        self.submit(from, op).await
    }

    /// Vote for delegates given by name.
    pub async fn vote_delegates(&self, from: KeyId, names: &[String]) -> Result<TxHash, NodeError> {
        let set = self.resolve_delegates(names)?;
        self.submit(from, Operation::VoteDelegates(set)).await
    }

    pub async fn revoke_delegates(&self, from: KeyId, names: &[String]) -> Result<TxHash, NodeError> {
        let set = self.resolve_delegates(names)?;
        self.submit(from, Operation::RevokeDelegates(set)).await
    }

    // ── Committees ──────────────────────────────────────────────────────

    pub async fn register_committee(
        &self,
        from: KeyId,
        name: &str,
        url: &str,
    ) -> Result<TxHash, NodeError> {
        let op = Operation::RegisterCommittee(RegisterCommittee {
            name: name.to_string(),
            url: url.to_string(),
        });
        self.submit(from, op).await
    }

    /// Back a committee given by hex address or by name.
    pub async fn vote_committee(&self, from: KeyId, committee: &str) -> Result<TxHash, NodeError> {
        let committee = self.resolve_committee(committee)?;
        self.submit(from, Operation::VoteCommittee(VoteCommittee { committee }))
            .await
    }

    pub async fn revoke_committee(&self, from: KeyId, committee: &str) -> Result<TxHash, NodeError> {
        let committee = self.resolve_committee(committee)?;
        self.submit(from, Operation::RevokeCommittee(RevokeCommittee { committee }))
            .await
    }

    // ── Bills ───────────────────────────────────────────────────────────

    /// Submit a bill on behalf of the committee `from`. Returns the
    /// transaction id and the id the bill will have once confirmed.
    pub async fn submit_bill(
        &self,
        from: KeyId,
        title: &str,
        detail: &str,
        url: &str,
        duration_days: u16,
        options: Vec<String>,
    ) -> Result<(TxHash, BillId), NodeError> {
        let bill = agora_crypto::bill_id(title);
        let op = Operation::SubmitBill(SubmitBill {
            title: title.to_string(),
            detail: detail.to_string(),
            url: url.to_string(),
            duration_days,
            options,
        });
        let txid = self.submit(from, op).await?;
        Ok((txid, bill))
    }

    pub async fn vote_bill(&self, from: KeyId, bill: BillId, option: u8) -> Result<TxHash, NodeError> {
        self.submit(from, Operation::VoteBill(VoteBill { bill, option }))
            .await
    }

    // ── Names ───────────────────────────────────────────────────────────

    pub async fn register_name(&self, from: KeyId, name: &str) -> Result<TxHash, NodeError> {
        let op = Operation::RegisterName(RegisterName {
            name: name.to_string(),
        });
        self.submit(from, op).await
    }

    // ── Tokens ──────────────────────────────────────────────────────────

    /// Create a token owned by `owner`. `supply` is in whole units and may
    /// carry at most `digits` decimals.
    pub async fn create_token(
        &self,
        owner: KeyId,
        symbol: &str,
        name: &str,
        token_address: KeyId,
        supply: &str,
        digits: u8,
    ) -> Result<TxHash, NodeError> {
        let total_amount = parse_fixed_point(supply, digits)?;
        let op = Operation::CreateToken(CreateToken {
            symbol: symbol.to_string(),
            name: name.to_string(),
            token_address,
            total_amount,
            digits,
        });
        self.submit(owner, op).await
    }

    /// Transfer `amount`, a decimal at the token's precision.
    pub async fn send_token(
        &self,
        token_address: &KeyId,
        from: KeyId,
        to: KeyId,
        amount: &str,
        comment: &str,
    ) -> Result<TxHash, NodeError> {
        let token = self.resolve_token(token_address)?;
        let op = Operation::TransferToken(TransferToken {
            token: token.id,
            to,
            amount: parse_fixed_point(amount, token.digits)?,
            comment: comment.to_string(),
        });
        self.submit(from, op).await
    }

    /// Lock `amount` for `to` until `blocks` blocks after the block the
    /// transaction is expected in.
    pub async fn lock_token(
        &self,
        token_address: &KeyId,
        from: KeyId,
        to: KeyId,
        amount: &str,
        blocks: u64,
        comment: &str,
    ) -> Result<TxHash, NodeError> {
        let token = self.resolve_token(token_address)?;
        let expiry_height = self.submission_context().height.saturating_add(blocks);
        let op = Operation::LockToken(LockToken {
            token: token.id,
            to,
            amount: parse_fixed_point(amount, token.digits)?,
            expiry_height,
            comment: comment.to_string(),
        });
        self.submit(from, op).await
    }

    // ── Core ────────────────────────────────────────────────────────────

    /// Validate, encode and broadcast `op` paid for by `from`.
    pub async fn submit(&self, from: KeyId, op: Operation) -> Result<TxHash, NodeError> {
        let result = self.broadcast(from, &op).await;
        match &result {
            Ok(txid) => {
                info!(kind = op.kind(), from = %from, txid = %txid, "operation submitted");
                if let Some(metrics) = &self.metrics {
                    metrics.submissions_accepted.inc();
                }
            }
            Err(e) => {
                debug!(kind = op.kind(), from = %from, error = %e, "submission refused");
                if let Some(metrics) = &self.metrics {
                    metrics.submissions_rejected.inc();
                }
            }
        }
        result
    }

    async fn broadcast(&self, from: KeyId, op: &Operation) -> Result<TxHash, NodeError> {
        let (payload, fee) = self.prepare(&from, op)?;
        match tokio::time::timeout(self.timeout, self.builder.submit(payload, fee, from)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(NodeError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Everything up to the builder call. The snapshot is released before
    /// returning.
    fn prepare(&self, from: &KeyId, op: &Operation) -> Result<(Vec<u8>, u64), NodeError> {
        let ctx = self.submission_context();
        {
            let snapshot = self.store.snapshot()?;
            validate(&snapshot, &ctx, from, op)?;
        }
        let fee = op.min_fee(&self.params.fees);
        let balance = self.oracle.spendable_balance(from);
        if balance < fee {
            return Err(NodeError::InsufficientFunds {
                balance,
                required: fee,
            });
        }
        Ok((encode(op)?, fee))
    }

    fn resolve_delegates(&self, names: &[String]) -> Result<DelegateSet, NodeError> {
        let snapshot = self.store.snapshot()?;
        let mut seen = BTreeSet::new();
        let mut delegates = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(NodeError::DuplicateName {
                    kind: "delegate",
                    name: name.clone(),
                });
            }
            let address = snapshot
                .delegate_by_name(name)?
                .ok_or_else(|| NodeError::UnknownName {
                    kind: "delegate",
                    name: name.clone(),
                })?;
            delegates.push(address);
        }
        Ok(DelegateSet::new(delegates))
    }

    fn resolve_committee(&self, committee: &str) -> Result<KeyId, NodeError> {
        if let Ok(address) = committee.parse::<KeyId>() {
            return Ok(address);
        }
        self.store
            .snapshot()?
            .committee_by_name(committee)?
            .ok_or_else(|| NodeError::UnknownName {
                kind: "committee",
                name: committee.to_string(),
            })
    }

    fn resolve_token(&self, token_address: &KeyId) -> Result<TokenRecord, NodeError> {
        let snapshot = self.store.snapshot()?;
        let unknown = || NodeError::UnknownName {
            kind: "token address",
            name: token_address.to_hex(),
        };
        let id = snapshot.token_by_address(token_address)?.ok_or_else(unknown)?;
        snapshot.token(id)?.ok_or_else(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_governance::Rejection;
    use agora_nullables::{NullBalanceOracle, NullClock, NullStore, NullTxBuilder};
    use agora_operations::{decode, BuildError};
    use agora_store::{CommitteeRecord, DelegateRecord, LedgerBatch};
    use agora_types::COIN;

    const ALICE: KeyId = KeyId::new([0xA1; 20]);
    const DANA: KeyId = KeyId::new([0xD1; 20]);
    const ELI: KeyId = KeyId::new([0xD2; 20]);

    struct Fixture {
        store: Arc<NullStore>,
        oracle: Arc<NullBalanceOracle>,
        builder: Arc<NullTxBuilder>,
        pipeline: SubmissionPipeline<NullStore, NullBalanceOracle, NullTxBuilder>,
    }

    fn fixture(params: ProtocolParams) -> Fixture {
        let store = Arc::new(NullStore::new());
        let oracle = Arc::new(NullBalanceOracle::with_balances([(ALICE, 100 * COIN)]));
        let builder = Arc::new(NullTxBuilder::new());
        let clock = Arc::new(NullClock::new(1_000, 600));
        let pipeline = SubmissionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&oracle),
            Arc::clone(&builder),
            clock,
            params,
        )
        .with_timeout(Duration::from_millis(50));
        Fixture {
            store,
            oracle,
            builder,
            pipeline,
        }
    }

    fn seed_delegates(store: &NullStore) {
        let mut batch = store.begin_batch().unwrap();
        for (address, name) in [(DANA, "dana"), (ELI, "eli")] {
            batch
                .insert_delegate(&DelegateRecord {
                    address,
                    name: name.into(),
                    registered_height: 1,
                })
                .unwrap();
        }
        batch.commit().unwrap();
    }

    #[tokio::test]
    async fn valid_operation_reaches_the_builder() {
        let f = fixture(ProtocolParams::live_defaults());
        let txid = f.pipeline.register_name(ALICE, "alice").await.unwrap();

        let sent = f.builder.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hash, txid);
        assert_eq!(sent[0].from, ALICE);
        assert_eq!(sent[0].fee, ProtocolParams::live_defaults().fees.register_name);
        assert_eq!(
            decode(&sent[0].payload).unwrap(),
            Operation::RegisterName(RegisterName { name: "alice".into() })
        );
    }

    #[tokio::test]
    async fn delegate_names_are_resolved() {
        let f = fixture(ProtocolParams::dev_defaults());
        seed_delegates(&f.store);

        f.pipeline
            .vote_delegates(ALICE, &["eli".into(), "dana".into()])
            .await
            .unwrap();
        let op = decode(&f.builder.submitted()[0].payload).unwrap();
        assert_eq!(op, Operation::VoteDelegates(DelegateSet::new([DANA, ELI])));

        assert!(matches!(
            f.pipeline.vote_delegates(ALICE, &["nobody".into()]).await,
            Err(NodeError::UnknownName { kind: "delegate", .. })
        ));
        assert!(matches!(
            f.pipeline
                .vote_delegates(ALICE, &["dana".into(), "dana".into()])
                .await,
            Err(NodeError::DuplicateName { .. })
        ));
    }

    #[tokio::test]
    async fn rejection_is_reported_and_nothing_is_sent() {
        let f = fixture(ProtocolParams::dev_defaults());
        let mut batch = f.store.begin_batch().unwrap();
        batch
            .insert_committee(&CommitteeRecord {
                address: DANA,
                name: "alpha".into(),
                url: "http://a".into(),
                registered_height: 1,
            })
            .unwrap();
        batch.commit().unwrap();

        let err = f
            .pipeline
            .register_committee(ALICE, "alpha", "http://b")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Rejected(Rejection::CommitteeNameTaken(ref name)) if name == "alpha"
        ));
        assert!(f.builder.submitted().is_empty());
    }

    #[tokio::test]
    async fn committee_accepts_name_or_address() {
        let f = fixture(ProtocolParams::dev_defaults());
        let mut batch = f.store.begin_batch().unwrap();
        batch
            .insert_committee(&CommitteeRecord {
                address: DANA,
                name: "alpha".into(),
                url: "http://a".into(),
                registered_height: 1,
            })
            .unwrap();
        batch.commit().unwrap();

        f.pipeline.vote_committee(ALICE, "alpha").await.unwrap();
        f.pipeline.vote_committee(ALICE, &DANA.to_hex()).await.unwrap();
        for sent in f.builder.submitted() {
            assert_eq!(
                decode(&sent.payload).unwrap(),
                Operation::VoteCommittee(VoteCommittee { committee: DANA })
            );
        }
        assert!(matches!(
            f.pipeline.vote_committee(ALICE, "beta").await,
            Err(NodeError::UnknownName { kind: "committee", .. })
        ));
    }

    #[tokio::test]
    async fn fee_must_be_covered() {
        let f = fixture(ProtocolParams::live_defaults());
        f.oracle.set_balance(ALICE, COIN);
        assert!(matches!(
            f.pipeline.register_delegate(ALICE, "alice").await,
            Err(NodeError::InsufficientFunds { balance, required })
                if balance == COIN && required == 10 * COIN
        ));
        assert!(f.builder.submitted().is_empty());
    }

    #[tokio::test]
    async fn builder_failure_is_surfaced() {
        let f = fixture(ProtocolParams::dev_defaults());
        f.builder
            .fail_with(BuildError::InsufficientFunds("no utxos".into()));
        assert!(matches!(
            f.pipeline.register_name(ALICE, "alice").await,
            Err(NodeError::Build(BuildError::InsufficientFunds(_)))
        ));
    }

    #[tokio::test]
    async fn stalled_builder_times_out() {
        let f = fixture(ProtocolParams::dev_defaults());
        f.builder.stall();
        assert!(matches!(
            f.pipeline.register_name(ALICE, "alice").await,
            Err(NodeError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn bill_id_is_title_hash() {
        let f = fixture(ProtocolParams::dev_defaults());
        let mut batch = f.store.begin_batch().unwrap();
        batch
            .insert_committee(&CommitteeRecord {
                address: ALICE,
                name: "alpha".into(),
                url: "http://a".into(),
                registered_height: 1,
            })
            .unwrap();
        batch.commit().unwrap();

        let (_, bill) = f
            .pipeline
            .submit_bill(ALICE, "t1", "d", "u", 1, vec!["yes".into(), "no".into()])
            .await
            .unwrap();
        assert_eq!(bill, agora_crypto::bill_id("t1"));
    }

    #[tokio::test]
    async fn oracle_can_be_a_trait_object() {
        let oracle: Arc<dyn BalanceOracle> =
            Arc::new(NullBalanceOracle::with_balances([(ALICE, COIN)]));
        let builder = Arc::new(NullTxBuilder::new());
        let pipeline: SubmissionPipeline<NullStore, dyn BalanceOracle, NullTxBuilder> =
            SubmissionPipeline::new(
                Arc::new(NullStore::new()),
                oracle,
                Arc::clone(&builder),
                Arc::new(NullClock::new(1_000, 600)),
                ProtocolParams::live_defaults(),
            );
        pipeline.register_name(ALICE, "alice").await.unwrap();
        assert_eq!(builder.submitted()[0].fee, COIN);
        assert!(matches!(
            pipeline.register_delegate(ALICE, "alice").await,
            Err(NodeError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_token_address_is_refused() {
        let f = fixture(ProtocolParams::dev_defaults());
        assert!(matches!(
            f.pipeline.send_token(&ELI, ALICE, DANA, "1", "").await,
            Err(NodeError::UnknownName { kind: "token address", .. })
        ));
    }
}
