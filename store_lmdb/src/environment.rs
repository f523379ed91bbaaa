//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::{Env, EnvOpenOptions};

use agora_store::{LedgerStore, StoreError};

use crate::integrity::{check_integrity, IntegrityReport};
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::tables::{Tables, TABLE_NAMES};
use crate::{LmdbBatch, LmdbError, LmdbSnapshot};

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    tables: Tables,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, opens every ledger database and
    /// brings the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        if max_dbs < TABLE_NAMES.len() as u32 {
            return Err(LmdbError::Schema(format!(
                "max_dbs {} is below the {} ledger databases",
                max_dbs,
                TABLE_NAMES.len()
            )));
        }
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the data
        // files are not modified by anything else while it is open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        let tables = Tables::create(&env)?;
        let environment = Self {
            env: Arc::new(env),
            tables,
        };

        Migrator::run(&environment.meta_store())?;
        tracing::info!(path = %path.display(), map_size, "ledger database opened");
        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.tables.meta,
        }
    }

    /// Count entries and cross-check secondary indices.
    pub fn integrity(&self) -> Result<IntegrityReport, LmdbError> {
        check_integrity(&self.env)
    }
}

impl LedgerStore for LmdbEnvironment {
    type Snapshot<'a> = LmdbSnapshot<'a>;
    type Batch<'a> = LmdbBatch<'a>;

    fn snapshot(&self) -> Result<LmdbSnapshot<'_>, StoreError> {
        let txn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(LmdbSnapshot {
            tables: self.tables,
            txn,
        })
    }

    /// LMDB admits one write transaction at a time, so this blocks until any
    /// other open batch is committed or dropped.
    fn begin_batch(&self) -> Result<LmdbBatch<'_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(LmdbBatch {
            tables: self.tables,
            txn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::{LedgerBatch, LedgerView, MetaStore};
    use agora_types::KeyId;

    #[test]
    fn reopen_keeps_committed_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 32, 1 << 20).unwrap();
            let mut batch = env.begin_batch().unwrap();
            batch.insert_name(&KeyId::new([1; 20]), "alice").unwrap();
            batch.commit().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 32, 1 << 20).unwrap();
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            crate::CURRENT_SCHEMA_VERSION
        );
        let snap = env.snapshot().unwrap();
        assert_eq!(
            snap.address_name(&KeyId::new([1; 20])).unwrap().as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn snapshot_does_not_see_later_commits() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 32, 1 << 20).unwrap();

        let before = env.snapshot().unwrap();
        let mut batch = env.begin_batch().unwrap();
        batch.insert_name(&KeyId::new([2; 20]), "bob").unwrap();
        batch.commit().unwrap();

        assert!(before.name_address("bob").unwrap().is_none());
        drop(before);
        assert_eq!(
            env.snapshot().unwrap().name_address("bob").unwrap(),
            Some(KeyId::new([2; 20]))
        );
    }

    #[test]
    fn too_few_databases_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LmdbEnvironment::open(dir.path(), 4, 1 << 20),
            Err(LmdbError::Schema(_))
        ));
    }
}
