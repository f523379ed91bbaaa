//! RPC method dispatch and response shapes.
//!
//! Write commands go through the node's submission pipeline and answer
//! with the hex transaction id. Queries run synchronously against one
//! snapshot, pinned to the last block chain sync recorded in it. Addresses, bill ids and transaction
//! ids are rendered as lowercase hex.

use agora_node::{PinnedBalances, SubmissionPipeline};
use agora_operations::TransactionBuilder;
use agora_query::{
    BillInfo, BillSummary, CommitteeInfo, DelegateInfo, DistributionBucket, OptionVoters,
    QueryEngine, TokenBalance, TokenInfo, VoterBill, VoterWeight, DEFAULT_COIN_RANK,
};
use agora_store::{BalanceOracle, LedgerStore};
use agora_types::{format_fixed_point, ChainContext, TxHash};
use agora_utils::describe_window;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::params::Params;

pub const WRITE_METHODS: &[&str] = &[
    "register",
    "vote",
    "cancelvote",
    "registercommittee",
    "votecommittee",
    "cancelvotecommittee",
    "submitbill",
    "votebill",
    "registername",
    "createtoken",
    "sendtoken",
    "locktoken",
];

pub const QUERY_METHODS: &[&str] = &[
    "listdelegates",
    "getdelegatevotes",
    "getdelegatefunds",
    "listvoteddelegates",
    "listreceivedvotes",
    "getcommittee",
    "listcommittees",
    "listcommitteevoters",
    "listcommitteebills",
    "listvotercommittees",
    "getbill",
    "listbills",
    "listbillvoters",
    "listvoterbills",
    "getaddressbalance",
    "getcoinrank",
    "getcoindistribution",
    "getaddressname",
    "getnameaddress",
    "gettokeninfo",
    "gettokenbalance",
];

// ── Responses ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DelegateResp {
    pub address: String,
    pub name: String,
}

impl From<DelegateInfo> for DelegateResp {
    fn from(d: DelegateInfo) -> Self {
        Self {
            address: d.address.to_hex(),
            name: d.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoterResp {
    pub address: String,
    pub votes: u64,
}

impl From<VoterWeight> for VoterResp {
    fn from(v: VoterWeight) -> Self {
        Self {
            address: v.address.to_hex(),
            votes: v.votes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommitteeResp {
    pub address: String,
    pub name: String,
    pub url: String,
    pub votes: u64,
}

impl From<CommitteeInfo> for CommitteeResp {
    fn from(c: CommitteeInfo) -> Self {
        Self {
            address: c.address.to_hex(),
            name: c.name,
            url: c.url,
            votes: c.votes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillSummaryResp {
    pub id: String,
    pub title: String,
}

impl From<BillSummary> for BillSummaryResp {
    fn from(b: BillSummary) -> Self {
        Self {
            id: b.id.to_string(),
            title: b.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillStateResp {
    pub finished: bool,
    pub passed: bool,
    pub option_index: Option<u8>,
    pub total_vote: u64,
    pub option_totals: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_height: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct BillResp {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub url: String,
    pub committee: String,
    pub start_time: u64,
    pub end_time: u64,
    /// Human description of the voting window at the pinned time.
    pub window: String,
    pub options: Vec<String>,
    pub state: BillStateResp,
}

impl BillResp {
    fn new(bill: BillInfo, at: ChainContext) -> Self {
        Self {
            id: bill.id.to_string(),
            title: bill.title,
            detail: bill.detail,
            url: bill.url,
            committee: bill.committee.to_hex(),
            start_time: bill.start_time.as_secs(),
            end_time: bill.end_time.as_secs(),
            window: describe_window(bill.end_time, at.time),
            options: bill.options,
            state: BillStateResp {
                finished: bill.status.finished,
                passed: bill.status.passed,
                option_index: bill.status.winning_option,
                total_vote: bill.status.total_vote,
                option_totals: bill.status.option_totals,
                finalized_height: bill.status.finalized_height,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OptionVotersResp {
    pub option: u8,
    pub voters: Vec<VoterResp>,
}

impl From<OptionVoters> for OptionVotersResp {
    fn from(o: OptionVoters) -> Self {
        Self {
            option: o.index,
            voters: o.voters.into_iter().map(VoterResp::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoterBillResp {
    pub bill: String,
    pub option: u8,
}

impl From<VoterBill> for VoterBillResp {
    fn from(v: VoterBill) -> Self {
        Self {
            bill: v.bill.to_string(),
            option: v.option,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BucketResp {
    pub threshold: u64,
    pub addresses: u64,
    pub coins: u64,
}

impl From<DistributionBucket> for BucketResp {
    fn from(b: DistributionBucket) -> Self {
        Self {
            threshold: b.threshold,
            addresses: b.addresses,
            coins: b.coins,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenInfoResp {
    pub id: u64,
    pub symbol: String,
    pub name: String,
    pub owner: String,
    pub token_address: String,
    pub total_supply: String,
    pub digits: u8,
    pub created_height: u64,
}

impl From<TokenInfo> for TokenInfoResp {
    fn from(t: TokenInfo) -> Self {
        Self {
            id: t.id.get(),
            total_supply: format_fixed_point(t.total_amount, t.digits),
            symbol: t.symbol,
            name: t.name,
            owner: t.owner.to_hex(),
            token_address: t.token_address.to_hex(),
            digits: t.digits,
            created_height: t.created_height,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LockResp {
    pub expiry_height: u64,
    pub amount: String,
    pub matured: bool,
}

#[derive(Debug, Serialize)]
pub struct TokenBalanceResp {
    pub symbol: String,
    pub token_address: String,
    pub balance: String,
    pub spendable: String,
    pub locks: Vec<LockResp>,
}

impl From<TokenBalance> for TokenBalanceResp {
    fn from(t: TokenBalance) -> Self {
        let digits = t.digits;
        Self {
            balance: format_fixed_point(t.available, digits),
            spendable: format_fixed_point(t.spendable(), digits),
            locks: t
                .locks
                .into_iter()
                .map(|l| LockResp {
                    expiry_height: l.expiry_height,
                    amount: format_fixed_point(l.amount, digits),
                    matured: l.matured,
                })
                .collect(),
            symbol: t.symbol,
            token_address: t.token_address.to_hex(),
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

fn list<T, R: Serialize + From<T>>(items: Vec<T>) -> Result<Value, RpcError> {
    to_value(items.into_iter().map(R::from).collect::<Vec<R>>())
}

fn txid(hash: TxHash) -> Value {
    Value::String(hash.to_string())
}

// ── Writes ──────────────────────────────────────────────────────────────

/// Run one write command through the submission pipeline.
pub async fn write<S, O, B>(
    pipeline: &SubmissionPipeline<S, O, B>,
    method: &str,
    p: &Params<'_>,
) -> Result<Value, RpcError>
where
    S: LedgerStore,
    O: BalanceOracle + ?Sized,
    B: TransactionBuilder,
{
    let value = match method {
        "register" => txid(pipeline.register_delegate(p.key(0, "address")?, p.str(1, "name")?).await?),
        "vote" | "cancelvote" => {
            let from = p.key(0, "address")?;
            let names = p.rest_strings(1, "delegate names")?;
            if names.is_empty() {
                return Err(RpcError::InvalidParams("at least one delegate name is required".into()));
            }
            let hash = if method == "vote" {
                pipeline.vote_delegates(from, &names).await?
            } else {
                pipeline.revoke_delegates(from, &names).await?
            };
            txid(hash)
        }
        "registercommittee" => txid(
            pipeline
                .register_committee(p.key(0, "address")?, p.str(1, "name")?, p.str(2, "url")?)
                .await?,
        ),
        "votecommittee" => txid(
            pipeline
                .vote_committee(p.key(0, "address")?, p.str(1, "committee")?)
                .await?,
        ),
        "cancelvotecommittee" => txid(
            pipeline
                .revoke_committee(p.key(0, "address")?, p.str(1, "committee")?)
                .await?,
        ),
        "submitbill" => {
            let days = p.u64(4, "duration days")?;
            let days = u16::try_from(days)
                .map_err(|_| RpcError::InvalidParams(format!("duration of {days} days is too long")))?;
            let (hash, bill) = pipeline
                .submit_bill(
                    p.key(0, "address")?,
                    p.str(1, "title")?,
                    p.str(2, "detail")?,
                    p.str(3, "url")?,
                    days,
                    p.rest_strings(5, "options")?,
                )
                .await?;
            json!({ "txid": hash.to_string(), "billid": bill.to_string() })
        }
        "votebill" => {
            let option = p.u64(2, "option index")?;
            let option = u8::try_from(option)
                .map_err(|_| RpcError::InvalidParams(format!("option index {option} out of range")))?;
            txid(pipeline.vote_bill(p.key(0, "address")?, p.bill(1)?, option).await?)
        }
        "registername" => txid(pipeline.register_name(p.key(0, "address")?, p.str(1, "name")?).await?),
        "createtoken" => {
            let digits = p.u64(5, "decimal")?;
            let digits = u8::try_from(digits)
                .map_err(|_| RpcError::InvalidParams(format!("{digits} decimals is too many")))?;
            txid(
                pipeline
                    .create_token(
                        p.key(2, "owner address")?,
                        p.str(0, "symbol")?,
                        p.str(1, "name")?,
                        p.key(3, "token address")?,
                        &p.amount(4, "total supply")?,
                        digits,
                    )
                    .await?,
            )
        }
        "sendtoken" => txid(
            pipeline
                .send_token(
                    &p.key(0, "token address")?,
                    p.key(1, "from address")?,
                    p.key(2, "to address")?,
                    &p.amount(3, "amount")?,
                    p.opt_str(4, "comment")?.unwrap_or_default(),
                )
                .await?,
        ),
        "locktoken" => txid(
            pipeline
                .lock_token(
                    &p.key(0, "token address")?,
                    p.key(1, "from address")?,
                    p.key(2, "to address")?,
                    &p.amount(3, "amount")?,
                    p.u64(4, "lock blocks")?,
                    p.opt_str(5, "comment")?.unwrap_or_default(),
                )
                .await?,
        ),
        other => return Err(RpcError::MethodNotFound(other.to_string())),
    };
    Ok(value)
}

// ── Queries ─────────────────────────────────────────────────────────────

/// Answer one query from a fresh snapshot of `store`, weighing votes with
/// the coin balances recorded in that same snapshot. Synchronous so the
/// snapshot never lives across an await point.
pub fn query<S: LedgerStore>(store: &S, method: &str, p: &Params<'_>) -> Result<Value, RpcError> {
    let snapshot = store.snapshot()?;
    let balances = PinnedBalances::load(&snapshot)?;
    let at = balances.context();
    let q = QueryEngine::new(&snapshot, &balances, at);
    match method {
        "listdelegates" => list::<_, DelegateResp>(q.list_delegates()?),
        "getdelegatevotes" => Ok(json!(q.delegate_votes(p.str(0, "delegate name")?)?)),
        "getdelegatefunds" => Ok(json!(q.delegate_funds(p.str(0, "delegate name")?)?)),
        "listvoteddelegates" => list::<_, DelegateResp>(q.voted_delegates(&p.key(0, "address")?)?),
        "listreceivedvotes" => list::<_, VoterResp>(q.received_votes(p.str(0, "delegate name")?)?),

        "getcommittee" => match q.committee(&p.key(0, "committee")?)? {
            Some(c) => to_value(CommitteeResp::from(c)),
            None => Ok(Value::Null),
        },
        "listcommittees" => list::<_, CommitteeResp>(q.list_committees()?),
        "listcommitteevoters" => list::<_, VoterResp>(q.committee_voters(&p.key(0, "committee")?)?),
        "listcommitteebills" => {
            list::<_, BillSummaryResp>(q.committee_bills(&p.key(0, "committee")?)?)
        }
        "listvotercommittees" => list::<_, CommitteeResp>(q.voter_committees(&p.key(0, "address")?)?),

        "getbill" => match q.bill(&p.bill(0)?)? {
            Some(bill) => to_value(BillResp::new(bill, at)),
            None => Ok(Value::Null),
        },
        "listbills" => to_value(
            q.list_bills()?
                .into_iter()
                .map(|bill| BillResp::new(bill, at))
                .collect::<Vec<_>>(),
        ),
        "listbillvoters" => list::<_, OptionVotersResp>(q.bill_voters(&p.bill(0)?)?),
        "listvoterbills" => list::<_, VoterBillResp>(q.voter_bills(&p.key(0, "address")?)?),

        "getaddressbalance" => Ok(json!(q.address_balance(&p.key(0, "address")?))),
        "getcoinrank" => {
            let n = p.opt_u64(0, "number")?.map_or(DEFAULT_COIN_RANK, |n| n as usize);
            to_value(
                q.coin_rank(n)
                    .into_iter()
                    .map(|h| json!({ "address": h.address.to_hex(), "balance": h.balance }))
                    .collect::<Vec<_>>(),
            )
        }
        "getcoindistribution" => {
            list::<_, BucketResp>(q.coin_distribution(&p.rest_u64(0, "thresholds")?)?)
        }

        "getaddressname" => Ok(q
            .address_name(&p.key(0, "address")?)?
            .map_or(Value::Null, Value::String)),
        "getnameaddress" => Ok(q
            .name_address(p.str(0, "name")?)?
            .map_or(Value::Null, |a| Value::String(a.to_hex()))),

        "gettokeninfo" => list::<_, TokenInfoResp>(q.token_info(p.opt_key(0, "token address")?.as_ref())?),
        "gettokenbalance" => list::<_, TokenBalanceResp>(q.token_balances(
            &p.key(0, "user address")?,
            p.opt_key(1, "token address")?.as_ref(),
        )?),

        other => Err(RpcError::MethodNotFound(other.to_string())),
    }
}
