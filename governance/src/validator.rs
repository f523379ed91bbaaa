//! The stateful rules for every operation.

use agora_crypto::bill_id;
use agora_operations::{
    check_format, CreateToken, DelegateSet, LockToken, Operation, RegisterCommittee,
    RegisterDelegate, SubmitBill, TransferToken, VoteBill,
};
use agora_store::{BillRecord, CommitteeRecord, DelegateRecord, LedgerView, TokenLock, TokenRecord};
use agora_types::{pow10, BlockHeight, ChainContext, KeyId, TokenId};

use crate::params::{bill_end_time, MAX_DELEGATE_VOTES, MAX_TOKEN_SUPPLY};
use crate::{Effect, GovernanceError, Rejection, TokenDebit};

/// Validate `op` sent by `sender` against `view` at the chain position `ctx`.
pub fn validate<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    op: &Operation,
) -> Result<Effect, GovernanceError> {
    check_format(op)?;
    match op {
        Operation::RegisterDelegate(body) => register_delegate(view, ctx, sender, body),
        Operation::VoteDelegates(set) => vote_delegates(view, sender, set),
        Operation::RevokeDelegates(set) => revoke_delegates(view, sender, set),
        Operation::RegisterCommittee(body) => register_committee(view, ctx, sender, body),
        Operation::VoteCommittee(body) => {
            require_committee(view, &body.committee)?;
            if view.committee_vote_of(sender)?.is_some() {
                return Err(Rejection::CommitteeAlreadyVoted(body.committee).into());
            }
            Ok(Effect::VoteCommittee {
                voter: *sender,
                committee: body.committee,
            })
        }
        Operation::RevokeCommittee(body) => {
            require_committee(view, &body.committee)?;
            if view.committee_vote_of(sender)? != Some(body.committee) {
                return Err(Rejection::CommitteeNotVoted(body.committee).into());
            }
            Ok(Effect::RevokeCommittee {
                voter: *sender,
                committee: body.committee,
            })
        }
        Operation::SubmitBill(body) => submit_bill(view, ctx, sender, body),
        Operation::VoteBill(body) => vote_bill(view, ctx, sender, body),
        Operation::RegisterName(body) => {
            if view.address_name(sender)?.is_some() {
                return Err(Rejection::AddressNamed(*sender).into());
            }
            if view.name_address(&body.name)?.is_some() {
                return Err(Rejection::NameTaken(body.name.clone()).into());
            }
            Ok(Effect::RegisterName {
                address: *sender,
                name: body.name.clone(),
            })
        }
        Operation::CreateToken(body) => create_token(view, ctx, sender, body),
        Operation::TransferToken(TransferToken {
            token, to, amount, ..
        }) => Ok(Effect::TransferToken(debit(view, ctx, sender, *token, to, *amount)?)),
        Operation::LockToken(LockToken {
            token,
            to,
            amount,
            expiry_height,
            ..
        }) => {
            if *expiry_height <= ctx.height {
                return Err(Rejection::LockExpiryPassed {
                    expiry: *expiry_height,
                    height: ctx.height,
                }
                .into());
            }
            Ok(Effect::LockToken {
                debit: debit(view, ctx, sender, *token, to, *amount)?,
                expiry_height: *expiry_height,
            })
        }
        Operation::Unrecognized { opcode, .. } => {
            Err(Rejection::Unrecognized { opcode: *opcode }.into())
        }
    }
}

fn register_delegate<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    body: &RegisterDelegate,
) -> Result<Effect, GovernanceError> {
    if view.delegate(sender)?.is_some() {
        return Err(Rejection::DelegateRegistered(*sender).into());
    }
    if view.delegate_by_name(&body.name)?.is_some() {
        return Err(Rejection::DelegateNameTaken(body.name.clone()).into());
    }
    Ok(Effect::RegisterDelegate(DelegateRecord {
        address: *sender,
        name: body.name.clone(),
        registered_height: ctx.height,
    }))
}

fn vote_delegates<V: LedgerView + ?Sized>(
    view: &V,
    sender: &KeyId,
    set: &DelegateSet,
) -> Result<Effect, GovernanceError> {
    let existing = view.delegate_votes_of(sender)?;
    for delegate in &set.delegates {
        if view.delegate(delegate)?.is_none() {
            return Err(Rejection::UnknownDelegate(*delegate).into());
        }
        if existing.contains(delegate) {
            return Err(Rejection::DelegateAlreadyVoted(*delegate).into());
        }
    }
    let count = existing.len() + set.len();
    if count > MAX_DELEGATE_VOTES {
        return Err(Rejection::TooManyDelegateVotes {
            count,
            max: MAX_DELEGATE_VOTES,
        }
        .into());
    }
    Ok(Effect::VoteDelegates {
        voter: *sender,
        delegates: set.delegates.iter().copied().collect(),
    })
}

fn revoke_delegates<V: LedgerView + ?Sized>(
    view: &V,
    sender: &KeyId,
    set: &DelegateSet,
) -> Result<Effect, GovernanceError> {
    let existing = view.delegate_votes_of(sender)?;
    if let Some(missing) = set.delegates.iter().find(|d| !existing.contains(d)) {
        return Err(Rejection::DelegateNotVoted(*missing).into());
    }
    Ok(Effect::RevokeDelegates {
        voter: *sender,
        delegates: set.delegates.iter().copied().collect(),
    })
}

fn register_committee<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    body: &RegisterCommittee,
) -> Result<Effect, GovernanceError> {
    if view.committee(sender)?.is_some() {
        return Err(Rejection::CommitteeRegistered(*sender).into());
    }
    if view.committee_by_name(&body.name)?.is_some() {
        return Err(Rejection::CommitteeNameTaken(body.name.clone()).into());
    }
    Ok(Effect::RegisterCommittee(CommitteeRecord {
        address: *sender,
        name: body.name.clone(),
        url: body.url.clone(),
        registered_height: ctx.height,
    }))
}

fn require_committee<V: LedgerView + ?Sized>(view: &V, committee: &KeyId) -> Result<(), GovernanceError> {
    match view.committee(committee)? {
        Some(_) => Ok(()),
        None => Err(Rejection::UnknownCommittee(*committee).into()),
    }
}

fn submit_bill<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    body: &SubmitBill,
) -> Result<Effect, GovernanceError> {
    if view.committee(sender)?.is_none() {
        return Err(Rejection::NotCommittee(*sender).into());
    }
    let id = bill_id(&body.title);
    if view.bill(&id)?.is_some() {
        return Err(Rejection::BillExists(id).into());
    }
    Ok(Effect::SubmitBill(BillRecord {
        id,
        title: body.title.clone(),
        detail: body.detail.clone(),
        url: body.url.clone(),
        committee: *sender,
        start_time: ctx.time,
        end_time: bill_end_time(ctx.time, body.duration_days),
        options: body.options.clone(),
        submitted_height: ctx.height,
    }))
}

fn vote_bill<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    body: &VoteBill,
) -> Result<Effect, GovernanceError> {
    let bill = view
        .bill(&body.bill)?
        .ok_or(Rejection::UnknownBill(body.bill))?;
    if bill.is_finished_at(ctx.time) || view.bill_state(&body.bill)?.is_some() {
        return Err(Rejection::BillFinished(body.bill).into());
    }
    if usize::from(body.option) >= bill.options.len() {
        return Err(Rejection::OptionOutOfRange {
            option: body.option,
            count: bill.options.len(),
        }
        .into());
    }
    if view.bill_vote(&body.bill, sender)?.is_some() {
        return Err(Rejection::BillAlreadyVoted(body.bill).into());
    }
    Ok(Effect::VoteBill {
        bill: body.bill,
        voter: *sender,
        option: body.option,
    })
}

fn create_token<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    body: &CreateToken,
) -> Result<Effect, GovernanceError> {
    if view.address_name(sender)?.is_none() {
        return Err(Rejection::OwnerUnnamed(*sender).into());
    }
    if view.token_by_address(&body.token_address)?.is_some() {
        return Err(Rejection::TokenAddressBound(body.token_address).into());
    }
    // digits <= MAX_DIGITS was checked by check_format, so the unit fits.
    let unit = pow10(body.digits).unwrap_or(u64::MAX);
    if body.total_amount % unit != 0 {
        return Err(Rejection::FractionalSupply {
            total: body.total_amount,
            digits: body.digits,
        }
        .into());
    }
    let supply = body.total_amount / unit;
    if supply > MAX_TOKEN_SUPPLY {
        return Err(Rejection::SupplyTooLarge {
            supply,
            max: MAX_TOKEN_SUPPLY,
        }
        .into());
    }
    if view.token_by_symbol(sender, &body.symbol)?.is_some() {
        return Err(Rejection::TokenSymbolTaken(body.symbol.clone()).into());
    }
    Ok(Effect::CreateToken(TokenRecord {
        id: view.next_token_id()?,
        symbol: body.symbol.clone(),
        name: body.name.clone(),
        owner: *sender,
        token_address: body.token_address,
        total_amount: body.total_amount,
        digits: body.digits,
        created_height: ctx.height,
    }))
}

fn debit<V: LedgerView + ?Sized>(
    view: &V,
    ctx: &ChainContext,
    sender: &KeyId,
    token: TokenId,
    to: &KeyId,
    amount: u64,
) -> Result<TokenDebit, GovernanceError> {
    let record = view.token(token)?.ok_or(Rejection::UnknownToken(token))?;
    if amount > record.total_amount {
        return Err(Rejection::AmountExceedsSupply {
            amount,
            total: record.total_amount,
        }
        .into());
    }
    let (available, matured) = spendable_token_balance(view, token, sender, ctx.height)?;
    let spendable = matured
        .iter()
        .fold(available, |acc, lock| acc.saturating_add(lock.amount));
    if spendable < amount {
        return Err(Rejection::InsufficientTokenBalance {
            spendable,
            required: amount,
        }
        .into());
    }
    Ok(TokenDebit {
        token,
        from: *sender,
        to: *to,
        amount,
        matured,
    })
}

/// The available balance of `holder` and its locks matured at `height`.
pub fn spendable_token_balance<V: LedgerView + ?Sized>(
    view: &V,
    token: TokenId,
    holder: &KeyId,
    height: BlockHeight,
) -> Result<(u64, Vec<TokenLock>), GovernanceError> {
    let available = view.token_balance(token, holder)?;
    let matured = view
        .token_locks(token, holder)?
        .into_iter()
        .filter(|lock| lock.is_matured_at(height))
        .collect();
    Ok((available, matured))
}
