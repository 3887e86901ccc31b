//! Build and test result records.
//!
//! CI stages communicate through small JSON files: every build and test job
//! writes one record, and later stages scan whole directories of them to
//! decide what to test and what to release.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::util::{self, Shell};

/// Outcome of one build or test matrix job.
///
/// Field order is the wire order of the JSON record. `test_name` only
/// appears on test records. `status` tolerates absence because a job that
/// died half-way may leave a partial record behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub plugin: String,
    pub version: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    pub runner: String,
    #[serde(default)]
    pub status: String,
}

impl ResultRecord {
    pub fn build(
        plugin: impl Into<String>,
        version: impl Into<String>,
        platform: impl Into<String>,
        runner: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        ResultRecord {
            plugin: plugin.into(),
            version: version.into(),
            platform: platform.into(),
            test_name: None,
            runner: runner.into(),
            status: status.into(),
        }
    }

    pub fn test(
        plugin: impl Into<String>,
        version: impl Into<String>,
        platform: impl Into<String>,
        test_name: impl Into<String>,
        runner: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        ResultRecord {
            test_name: Some(test_name.into()),
            ..ResultRecord::build(plugin, version, platform, runner, status)
        }
    }

    /// The `(plugin, version, platform)` identity records are joined on
    /// across CI stages.
    pub fn key(&self) -> (String, String, String) {
        (
            self.plugin.clone(),
            self.version.clone(),
            self.platform.clone(),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Parse every `*.json` record under `dir`, recursively.
///
/// A missing directory is an empty result set. Unparsable files are
/// reported and skipped so one corrupt upload cannot sink a whole
/// aggregation stage.
pub fn load_records(dir: &Path, shell: &Shell) -> Vec<ResultRecord> {
    let mut records = Vec::new();
    if !dir.exists() {
        return records;
    }

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("json")
        {
            continue;
        }

        let parsed = util::fs::read_to_string(path)
            .and_then(|text| serde_json::from_str::<ResultRecord>(&text).map_err(Into::into));
        match parsed {
            Ok(record) => records.push(record),
            Err(err) => shell.warn(format!("unable to parse {}: {err:#}", path.display())),
        }
    }

    records
}

/// Write a build record to `result_file`, creating parent directories.
pub fn record_build(record: &ResultRecord, result_file: &Path) -> Result<()> {
    let payload = serde_json::to_string(record).context("failed to serialize build record")?;
    util::fs::write_string(result_file, &payload)
}

/// Write a test record, deriving the default path when none is given.
///
/// When `path_marker` is set, the chosen record path is also written there
/// so a later workflow step can pick the record up without recomputing the
/// slug. Returns the path the record landed at.
pub fn record_test(
    record: &ResultRecord,
    result_file: Option<&Path>,
    path_marker: Option<&Path>,
) -> Result<PathBuf> {
    let path = match result_file {
        Some(path) => path.to_path_buf(),
        None => default_test_result_path(record),
    };

    let payload = serde_json::to_string(record).context("failed to serialize test record")?;
    util::fs::write_string(&path, &payload)?;

    if let Some(marker) = path_marker {
        util::fs::write_string(marker, &path.display().to_string())?;
    }

    Ok(path)
}

/// Default test-record path:
/// `test-status/<plugin>-<version>-<platform>-<slug>.json`.
pub fn default_test_result_path(record: &ResultRecord) -> PathBuf {
    let slug = slug(record.test_name.as_deref().unwrap_or_default());
    PathBuf::from("test-status").join(format!(
        "{}-{}-{}-{}.json",
        record.plugin, record.version, record.platform, slug
    ))
}

/// Collapse every run of characters outside `[A-Za-z0-9._-]` to one `_`.
fn slug(name: &str) -> String {
    match Regex::new(r"[^A-Za-z0-9._-]+") {
        Ok(re) => re.replace_all(name, "_").into_owned(),
        Err(_) => name.to_string(),
    }
}
