//! Fixed-point amounts.
//!
//! Coin and token amounts are `u64` integers scaled by an explicit number of
//! decimal digits. Coins always use eight digits; tokens choose between zero
//! and [`MAX_DIGITS`] at creation.

use crate::AgoraError;

/// Number of raw units in one coin.
pub const COIN: u64 = 100_000_000;

/// Largest number of decimal digits a token may declare.
pub const MAX_DIGITS: u8 = 8;

/// `10^digits`, or `None` when `digits` exceeds [`MAX_DIGITS`].
pub fn pow10(digits: u8) -> Option<u64> {
    if digits > MAX_DIGITS {
        return None;
    }
    Some(10u64.pow(digits as u32))
}

/// Parse an unsigned decimal string into a raw amount with `digits` decimals.
///
/// Accepts `"12"`, `"12.5"` and `".5"`; rejects signs, exponents, more
/// fractional digits than `digits`, and values that overflow `u64`.
pub fn parse_fixed_point(s: &str, digits: u8) -> Result<u64, AgoraError> {
    let invalid = || AgoraError::InvalidAmount(s.to_string());
    let scale = pow10(digits).ok_or_else(invalid)?;

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_part.len() > digits as usize {
        return Err(invalid());
    }

    let int_value: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let mut frac_value: u64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| invalid())?
    };
    for _ in frac_part.len()..digits as usize {
        frac_value *= 10;
    }

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(invalid)
}

/// Render a raw amount with `digits` decimals, trimming trailing zeros.
pub fn format_fixed_point(raw: u64, digits: u8) -> String {
    let Some(scale) = pow10(digits) else {
        return raw.to_string();
    };
    let int_part = raw / scale;
    let frac_part = raw % scale;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{:0width$}", frac_part, width = digits as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}
