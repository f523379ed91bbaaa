//! LMDB storage backend for the Agora ledger.
//!
//! Implements the `agora-store` ledger traits using the `heed` LMDB bindings.
//! Each logical table maps to one named LMDB database within a single
//! environment; secondary indices use big-endian composite keys so that
//! prefix range scans return entries in key order.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod write_batch;

mod keys;
mod read;
mod tables;
mod view;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use view::LmdbSnapshot;
pub use write_batch::LmdbBatch;
