use agora_operations::FormatError;
use agora_store::StoreError;
use agora_types::{BillId, BlockHeight, KeyId, TokenId};
use thiserror::Error;

/// Why an operation has no ledger effect.
///
/// The applier drops rejected operations silently (the fee is still paid);
/// the submission pipeline reports the message to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("unrecognized operation {opcode:#04x}")]
    Unrecognized { opcode: u8 },

    #[error("fee {paid} is below the minimum {required}")]
    FeeTooLow { paid: u64, required: u64 },

    // ── Delegates ───────────────────────────────────────────────────────
    #[error("address {0} is already a delegate")]
    DelegateRegistered(KeyId),

    #[error("delegate name '{0}' is already registered")]
    DelegateNameTaken(String),

    #[error("delegate {0} is not registered")]
    UnknownDelegate(KeyId),

    #[error("already voted for delegate {0}")]
    DelegateAlreadyVoted(KeyId),

    #[error("an address can vote for at most {max} delegates, this would make {count}")]
    TooManyDelegateVotes { count: usize, max: usize },

    #[error("no vote for delegate {0} to revoke")]
    DelegateNotVoted(KeyId),

    // ── Committees ──────────────────────────────────────────────────────
    #[error("address {0} is already a committee")]
    CommitteeRegistered(KeyId),

    #[error("committee name '{0}' is already registered")]
    CommitteeNameTaken(String),

    #[error("committee {0} is not registered")]
    UnknownCommittee(KeyId),

    #[error("already voted for committee {0}")]
    CommitteeAlreadyVoted(KeyId),

    #[error("no vote for committee {0} to revoke")]
    CommitteeNotVoted(KeyId),

    // ── Bills ───────────────────────────────────────────────────────────
    #[error("bill submitter {0} is not a registered committee")]
    NotCommittee(KeyId),

    #[error("a bill titled like {0} already exists")]
    BillExists(BillId),

    #[error("bill {0} does not exist")]
    UnknownBill(BillId),

    #[error("voting on bill {0} has finished")]
    BillFinished(BillId),

    #[error("option {option} is out of range, bill has {count} options")]
    OptionOutOfRange { option: u8, count: usize },

    #[error("already voted on bill {0}")]
    BillAlreadyVoted(BillId),

    // ── Names ───────────────────────────────────────────────────────────
    #[error("address {0} already has a name")]
    AddressNamed(KeyId),

    #[error("name '{0}' is already registered")]
    NameTaken(String),

    // ── Tokens ──────────────────────────────────────────────────────────
    #[error("token owner {0} has not registered a name")]
    OwnerUnnamed(KeyId),

    #[error("token address {0} is already bound to a token")]
    TokenAddressBound(KeyId),

    #[error("token symbol '{0}' is already registered by this owner")]
    TokenSymbolTaken(String),

    #[error("total amount {total} is not a whole number of units with {digits} digits")]
    FractionalSupply { total: u64, digits: u8 },

    #[error("token supply {supply} exceeds the maximum {max}")]
    SupplyTooLarge { supply: u64, max: u64 },

    #[error("token {0} does not exist")]
    UnknownToken(TokenId),

    #[error("amount {amount} exceeds the token's total supply {total}")]
    AmountExceedsSupply { amount: u64, total: u64 },

    #[error("token balance insufficient: spendable {spendable}, required {required}")]
    InsufficientTokenBalance { spendable: u64, required: u64 },

    #[error("lock expiry height {expiry} is not above the current height {height}")]
    LockExpiryPassed { expiry: BlockHeight, height: BlockHeight },
}

/// A validation that could not reach a verdict, or reached a rejection.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<FormatError> for GovernanceError {
    fn from(e: FormatError) -> Self {
        Self::Rejected(Rejection::Format(e))
    }
}
