//! Stateless operation checks.
//!
//! These look only at the payload itself: lengths, character sets and
//! ranges. Checks that need ledger state (uniqueness, existence, balances)
//! are done by the governance validator.

use agora_types::MAX_DIGITS;

use crate::{FormatError, Operation};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 16;
pub const MAX_URL_LEN: usize = 256;
pub const MAX_TITLE_LEN: usize = 128;
pub const MAX_DETAIL_LEN: usize = 256;
pub const MAX_OPTION_LEN: usize = 256;
pub const MAX_BILL_OPTIONS: usize = 16;
pub const MAX_BILL_DAYS: u16 = 360;
pub const MAX_COMMENT_LEN: usize = 256;
pub const MAX_SYMBOL_LEN: usize = 16;
pub const MAX_TOKEN_NAME_LEN: usize = 64;
/// Most delegates a single address may vote for at once.
pub const MAX_DELEGATE_VOTES: usize = 51;

/// Check the stateless rules for an operation.
///
/// Unrecognized operations have no rules here; the validator rejects them.
pub fn check_format(op: &Operation) -> Result<(), FormatError> {
    match op {
        Operation::RegisterDelegate(body) => check_name(&body.name),
        Operation::VoteDelegates(set) | Operation::RevokeDelegates(set) => {
            if set.is_empty() || set.len() > MAX_DELEGATE_VOTES {
                return Err(FormatError::DelegateCount {
                    count: set.len(),
                    max: MAX_DELEGATE_VOTES,
                });
            }
            Ok(())
        }
        Operation::RegisterCommittee(body) => {
            check_name(&body.name)?;
            check_len("url", &body.url, MAX_URL_LEN)
        }
        Operation::VoteCommittee(_) | Operation::RevokeCommittee(_) => Ok(()),
        Operation::SubmitBill(body) => {
            if body.title.is_empty() {
                return Err(FormatError::Empty("title"));
            }
            check_len("title", &body.title, MAX_TITLE_LEN)?;
            check_len("detail", &body.detail, MAX_DETAIL_LEN)?;
            check_len("url", &body.url, MAX_URL_LEN)?;
            if body.duration_days == 0 || body.duration_days > MAX_BILL_DAYS {
                return Err(FormatError::BillDuration {
                    days: body.duration_days,
                    max: MAX_BILL_DAYS,
                });
            }
            if body.options.is_empty() || body.options.len() > MAX_BILL_OPTIONS {
                return Err(FormatError::OptionCount {
                    count: body.options.len(),
                    max: MAX_BILL_OPTIONS,
                });
            }
            for option in &body.options {
                if option.is_empty() {
                    return Err(FormatError::Empty("option"));
                }
                check_len("option", option, MAX_OPTION_LEN)?;
            }
            Ok(())
        }
        Operation::VoteBill(_) => Ok(()),
        Operation::RegisterName(body) => check_name(&body.name),
        Operation::CreateToken(body) => {
            check_symbol(&body.symbol)?;
            if body.name.is_empty() {
                return Err(FormatError::Empty("token name"));
            }
            check_len("token name", &body.name, MAX_TOKEN_NAME_LEN)?;
            if body.digits > MAX_DIGITS {
                return Err(FormatError::Digits {
                    digits: body.digits,
                    max: MAX_DIGITS,
                });
            }
            if body.total_amount == 0 {
                return Err(FormatError::ZeroAmount);
            }
            Ok(())
        }
        Operation::TransferToken(body) => {
            if body.amount == 0 {
                return Err(FormatError::ZeroAmount);
            }
            check_len("comment", &body.comment, MAX_COMMENT_LEN)
        }
        Operation::LockToken(body) => {
            if body.amount == 0 {
                return Err(FormatError::ZeroAmount);
            }
            check_len("comment", &body.comment, MAX_COMMENT_LEN)
        }
        Operation::Unrecognized { .. } => Ok(()),
    }
}

/// Names of delegates, committees and addresses: 2-16 of `[A-Za-z0-9_-]`.
pub fn check_name(name: &str) -> Result<(), FormatError> {
    let valid_len = (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name.len());
    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(FormatError::InvalidName(name.to_string()))
    }
}

fn check_symbol(symbol: &str) -> Result<(), FormatError> {
    let valid_len = (1..=MAX_SYMBOL_LEN).contains(&symbol.len());
    if valid_len && symbol.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(FormatError::InvalidSymbol(symbol.to_string()))
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), FormatError> {
    if value.len() > max {
        return Err(FormatError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}
