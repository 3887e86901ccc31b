//! Release matrix aggregation.
//!
//! The final CI stage publishes the plugin builds whose required tests all
//! passed. Build and test jobs leave JSON records behind; this joins them
//! against the base test matrix to decide which `(plugin, version,
//! platform)` combinations ship.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::ops::matrix;
use crate::ops::record::{self, ResultRecord};
use crate::util::Shell;

/// One releasable `(plugin, version, platform)` combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReleaseEntry {
    pub plugin: String,
    pub version: String,
    pub platform: String,
}

/// What ships and what was held back.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    /// Releasable combinations, sorted.
    pub entries: Vec<ReleaseEntry>,
    /// Combinations whose build succeeded but whose required tests are
    /// missing or failed, sorted.
    pub skipped: Vec<ReleaseEntry>,
}

/// Join build records, test records, and the base test matrix.
///
/// A combination is releasable when its build succeeded and, if the base
/// test matrix expected tests for it, at least one test record exists and
/// every recorded test succeeded. Combinations absent from the base test
/// matrix release on build success alone.
pub fn release_matrix(
    build_results_dir: &Path,
    test_results_dir: &Path,
    base_test_matrix: &Path,
    shell: &Shell,
) -> Result<ReleaseReport> {
    let build_records = record::load_records(build_results_dir, shell);
    let test_records = record::load_records(test_results_dir, shell);
    let required: HashSet<(String, String, String)> = matrix::load_matrix_file(base_test_matrix)?
        .into_iter()
        .map(|entry| entry.key())
        .collect();

    let mut build_status: HashMap<(String, String, String), String> = HashMap::new();
    for record in build_records {
        let key = record.key();
        build_status.insert(key, record.status);
    }

    let mut tests_by_key: HashMap<(String, String, String), Vec<ResultRecord>> = HashMap::new();
    for record in test_records {
        tests_by_key.entry(record.key()).or_default().push(record);
    }

    let passing: HashSet<&(String, String, String)> = tests_by_key
        .iter()
        .filter(|(_, records)| records.iter().all(ResultRecord::is_success))
        .map(|(key, _)| key)
        .collect();

    let mut report = ReleaseReport::default();
    for (key, status) in &build_status {
        if status != "success" {
            continue;
        }
        let entry = ReleaseEntry {
            plugin: key.0.clone(),
            version: key.1.clone(),
            platform: key.2.clone(),
        };
        if required.contains(key) && !passing.contains(key) {
            report.skipped.push(entry);
        } else {
            report.entries.push(entry);
        }
    }

    report.entries.sort();
    report.skipped.sort();
    Ok(report)
}
