//! Shared utilities for Agora nodes.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, LoggingError};
pub use time::{describe_window, format_duration};
