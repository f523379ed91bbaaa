use agora_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("delegate '{0}' is not registered")]
    UnknownDelegate(String),

    #[error("at least one distribution threshold is required")]
    NoThresholds,

    #[error("distribution thresholds must be positive")]
    ZeroThreshold,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
