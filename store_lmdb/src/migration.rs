//! Schema versioning for the ledger database.
//!
//! The meta table records the schema the files were written with. Opening
//! an older database walks it forward one step at a time; a database stamped
//! by a newer build is left untouched and refused.

use agora_store::MetaStore;

use crate::LmdbError;

/// Schema written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// One upgrade step, from `version - 1` to `version`.
struct Step {
    version: u32,
    describe: &'static str,
}

/// Ordered upgrade steps. Every table is created by the environment before
/// the migrator runs, so a step only has to fix up existing data.
const STEPS: &[Step] = &[
    Step {
        version: 1,
        describe: "initial ledger tables",
    },
    Step {
        // Starts empty; chain sync refills it from the next delivered block.
        version: 2,
        describe: "coin balances recorded by chain sync",
    },
];

pub struct Migrator;

impl Migrator {
    /// Bring the stored schema up to [`CURRENT_SCHEMA_VERSION`].
    pub fn run(meta: &impl MetaStore) -> Result<(), LmdbError> {
        let stored = meta
            .get_schema_version()
            .map_err(|e| LmdbError::Schema(e.to_string()))?;
        let pending = pending_steps(stored)?;
        if pending.is_empty() {
            tracing::debug!(version = stored, "ledger schema current");
            return Ok(());
        }
        for step in pending {
            tracing::info!(version = step.version, step = step.describe, "upgrading ledger schema");
        }
        meta.set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Schema(e.to_string()))
    }
}

/// Steps needed to move a database at `stored` to the current schema.
fn pending_steps(stored: u32) -> Result<&'static [Step], LmdbError> {
    if stored > CURRENT_SCHEMA_VERSION {
        return Err(LmdbError::Schema(format!(
            "ledger was written with schema {stored}; this build reads up to {CURRENT_SCHEMA_VERSION}"
        )));
    }
    let first = STEPS.partition_point(|step| step.version <= stored);
    Ok(&STEPS[first..])
}
