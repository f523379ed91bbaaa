//! LMDB database integrity checks.
//!
//! Run on startup (and by `ledger verify`) to detect corruption early,
//! before the node begins applying blocks.

use std::path::Path;

use heed::types::Bytes;
use heed::{Env, RoTxn};

use crate::tables::TABLE_NAMES;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Primary/secondary pairs whose entry counts must agree.
const INDEX_PAIRS: &[(&str, &str)] = &[
    ("delegates", "delegate_names"),
    ("delegate_votes", "delegate_voters"),
    ("committees", "committee_names"),
    ("committee_votes", "committee_voters"),
    ("bills", "committee_bills"),
    ("bill_votes", "voter_bills"),
    ("names", "name_index"),
    ("tokens", "token_addresses"),
    ("tokens", "token_symbols"),
];

fn count(env: &Env, rtxn: &RoTxn, name: &str) -> Result<Option<u64>, heed::Error> {
    match env.open_database::<Bytes, Bytes>(rtxn, Some(name))? {
        Some(db) => Ok(Some(db.len(rtxn)?)),
        None => Ok(None),
    }
}

/// Check LMDB database integrity.
///
/// Counts the entries of each expected database and compares every
/// secondary index against its primary table. Read failures and mismatches
/// are recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &Env) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let rtxn = env.read_txn()?;

    for &db_name in TABLE_NAMES {
        match count(env, &rtxn, db_name) {
            Ok(Some(entries)) => {
                report.databases_checked += 1;
                report.total_entries += entries;
            }
            Ok(None) => {
                report.errors.push(format!("database '{}' is missing", db_name));
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to read database '{}': {}", db_name, e));
            }
        }
    }

    for &(primary, index) in INDEX_PAIRS {
        if let (Ok(Some(a)), Ok(Some(b))) = (count(env, &rtxn, primary), count(env, &rtxn, index)) {
            if a != b {
                report.errors.push(format!(
                    "index '{}' has {} entries but '{}' has {}",
                    index, b, primary, a
                ));
            }
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(()); // Fresh start
    }
    if path.read_dir().map(|mut d| d.next().is_none()).unwrap_or(false) {
        return Ok(()); // Empty directory, about to be initialised
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
