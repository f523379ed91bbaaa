use thiserror::Error;

/// Failure to turn bytes into an operation, or an operation into bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty payload")]
    Empty,

    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    TooLarge { len: usize, max: usize },

    #[error("malformed {opcode:#04x} body: {reason}")]
    Malformed { opcode: u8, reason: String },

    #[error("non-canonical encoding of opcode {opcode:#04x}")]
    NonCanonical { opcode: u8 },
}

/// A stateless payload rule was broken.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid name '{0}': expected 2-16 characters of [A-Za-z0-9_-]")]
    InvalidName(String),

    #[error("invalid token symbol '{0}': expected 1-16 ASCII letters or digits")]
    InvalidSymbol(String),

    #[error("{field} is {len} bytes, limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("bill must offer between 1 and {max} options, got {count}")]
    OptionCount { count: usize, max: usize },

    #[error("delegate set must name between 1 and {max} delegates, got {count}")]
    DelegateCount { count: usize, max: usize },

    #[error("bill duration must be between 1 and {max} days, got {days}")]
    BillDuration { days: u16, max: u16 },

    #[error("token digits must be at most {max}, got {digits}")]
    Digits { digits: u8, max: u8 },

    #[error("amount must be positive")]
    ZeroAmount,
}
