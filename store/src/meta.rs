//! Metadata: schema version and the applier's resume position.

use agora_types::BlockHeight;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Position of the next confirmed transaction the applier expects.
///
/// Every transaction in blocks below `height`, and every transaction of
/// block `height` with index below `next_tx`, has been applied or skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplyCursor {
    pub height: BlockHeight,
    pub next_tx: u32,
}

impl ApplyCursor {
    pub fn new(height: BlockHeight, next_tx: u32) -> Self {
        Self { height, next_tx }
    }

    /// Whether the transaction at `(height, tx_index)` is already behind the cursor.
    pub fn covers(&self, height: BlockHeight, tx_index: u32) -> bool {
        height < self.height || (height == self.height && tx_index < self.next_tx)
    }
}

/// Trait for storing database metadata (schema version, configuration, etc.).
///
/// This is a generic key-value store for internal bookkeeping that doesn't
/// belong in any domain-specific table.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Get the current database schema version (0 for a fresh database).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
