//! CI matrix expansion.
//!
//! Build and test jobs fan out from JSON matrices generated off the plugin
//! manifests. A release's platform set is the union of all its build-rule
//! patterns expanded against the known platforms; the test matrix crosses
//! that set with the plugin's declared tests. Once builds have run, the
//! test matrix is filtered down to the platforms that actually produced an
//! artifact.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::manifest::{self, PluginManifest, Release};
use crate::core::platform::{matching_platforms, runner_for};
use crate::ops::record::{self, ResultRecord};
use crate::util::{self, Shell};

/// One matrix job. `test_name` only appears in test matrices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub plugin: String,
    pub version: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    pub runner: String,
}

impl MatrixEntry {
    /// The `(plugin, version, platform)` identity shared with result
    /// records.
    pub fn key(&self) -> (String, String, String) {
        (
            self.plugin.clone(),
            self.version.clone(),
            self.platform.clone(),
        )
    }
}

/// One `{plugin, version, platform}` entry per platform a release of each
/// plugin can build on.
pub fn build_matrix(
    plugins_dir: &Path,
    plugins: &[String],
    shell: &Shell,
) -> Result<Vec<MatrixEntry>> {
    let names = plugin_list(plugins_dir, plugins)?;
    shell.note(format!(
        "generating build matrix for {} plugin(s)",
        names.len()
    ));

    let mut entries = Vec::new();
    for name in &names {
        let Some(manifest) = load_or_skip(plugins_dir, name, shell)? else {
            continue;
        };
        for release in &manifest.releases {
            for platform in release_platforms(release) {
                entries.push(MatrixEntry {
                    plugin: name.clone(),
                    version: release.version.clone(),
                    platform: platform.to_string(),
                    test_name: None,
                    runner: runner_for(platform)?.to_string(),
                });
            }
        }
    }

    shell.note(format!("generated {} matrix entries", entries.len()));
    Ok(entries)
}

/// The build matrix crossed with each plugin's declared tests. Plugins
/// without tests contribute nothing.
pub fn test_matrix(
    plugins_dir: &Path,
    plugins: &[String],
    shell: &Shell,
) -> Result<Vec<MatrixEntry>> {
    let names = plugin_list(plugins_dir, plugins)?;
    shell.note(format!(
        "generating test matrix for {} plugin(s)",
        names.len()
    ));

    let mut entries = Vec::new();
    for name in &names {
        let Some(manifest) = load_or_skip(plugins_dir, name, shell)? else {
            continue;
        };
        if manifest.tests.is_empty() {
            continue;
        }
        for release in &manifest.releases {
            for platform in release_platforms(release) {
                for test in &manifest.tests {
                    entries.push(MatrixEntry {
                        plugin: name.clone(),
                        version: release.version.clone(),
                        platform: platform.to_string(),
                        test_name: Some(test.name.clone()),
                        runner: runner_for(platform)?.to_string(),
                    });
                }
            }
        }
    }

    shell.note(format!("generated {} test matrix entries", entries.len()));
    Ok(entries)
}

/// Keep only base test-matrix entries whose build produced a success
/// record. Build results are scanned recursively; a missing base matrix
/// filters to nothing.
pub fn filter_test_matrix(
    base_matrix: &Path,
    build_results_dir: &Path,
    shell: &Shell,
) -> Result<Vec<MatrixEntry>> {
    let base = load_matrix_file(base_matrix)?;
    let succeeded: HashSet<(String, String, String)> =
        record::load_records(build_results_dir, shell)
            .into_iter()
            .filter(ResultRecord::is_success)
            .map(|record| record.key())
            .collect();
    shell.note(format!(
        "found {} successful build entries",
        succeeded.len()
    ));

    Ok(base
        .into_iter()
        .filter(|entry| succeeded.contains(&entry.key()))
        .collect())
}

/// Load a matrix JSON file; a missing file is an empty matrix.
pub fn load_matrix_file(path: &Path) -> Result<Vec<MatrixEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = util::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse matrix file: {}", path.display()))
}

/// Render entries as a pretty JSON array.
pub fn matrix_json<T: Serialize>(entries: &[T]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("failed to serialize matrix")
}

/// Render the one-line `{"include": [...]}` object CI matrices are set
/// from.
pub fn github_matrix<T: Serialize>(entries: &[T]) -> Result<String> {
    serde_json::to_string(&Include { include: entries }).context("failed to serialize matrix")
}

/// Like [`github_matrix`], but indented for log output.
pub fn github_matrix_pretty<T: Serialize>(entries: &[T]) -> Result<String> {
    serde_json::to_string_pretty(&Include { include: entries })
        .context("failed to serialize matrix")
}

#[derive(Serialize)]
struct Include<'a, T> {
    include: &'a [T],
}

/// Append `key=value` lines to a CI output file.
pub fn append_ci_outputs(path: &Path, pairs: &[(&str, &str)]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open CI output file: {}", path.display()))?;
    for (key, value) in pairs {
        writeln!(file, "{key}={value}")
            .with_context(|| format!("failed to write CI output file: {}", path.display()))?;
    }
    Ok(())
}

/// Platforms a release can build on: the union of every build-rule
/// pattern, alphabetically sorted.
fn release_platforms(release: &Release) -> BTreeSet<&'static str> {
    let mut platforms = BTreeSet::new();
    for pattern in release.build.patterns() {
        platforms.extend(matching_platforms(pattern));
    }
    platforms
}

/// Plugin names to expand: the explicit list, or every plugin on disk.
fn plugin_list(plugins_dir: &Path, plugins: &[String]) -> Result<Vec<String>> {
    if plugins.is_empty() {
        manifest::list_plugins(plugins_dir)
    } else {
        Ok(plugins.to_vec())
    }
}

/// Load a plugin manifest, reporting and skipping names with no config on
/// disk. Present-but-broken configs still fail the whole expansion.
fn load_or_skip(
    plugins_dir: &Path,
    name: &str,
    shell: &Shell,
) -> Result<Option<PluginManifest>> {
    let path = manifest::manifest_path(plugins_dir, name);
    if !path.exists() {
        shell.warn(format!("plugin config not found: {}", path.display()));
        return Ok(None);
    }
    manifest::load_plugin_manifest(plugins_dir, name).map(Some)
}
