//! Plugin manifest model and loading.
//!
//! Each plugin lives under `plugins/<name>/<name>.yml`. The manifest carries
//! the plugin's releases (what to fetch and how to build it per platform),
//! a catalogue of buildable dependencies, optional tests, and attachment
//! payloads the tests can materialize.
//!
//! Platform-keyed sections deserialize into [`RuleSet`] so YAML document
//! order survives parsing; see `core/ruleset.rs` for why that matters.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::builder::env::Env;
use crate::core::dep_key::DepKey;
use crate::core::ruleset::RuleSet;
use crate::util;

/// Top-level plugin manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    /// Global env overrides, folded into every build on a matching platform.
    #[serde(default)]
    pub env: RuleSet<Env>,
    /// Buildable releases of this plugin.
    #[serde(default)]
    pub releases: Vec<Release>,
    /// Catalogue of dependencies releases can reference by name + version.
    #[serde(default)]
    pub dependencies: HashMap<String, DependencyEntry>,
    /// Post-build test definitions.
    #[serde(default)]
    pub tests: Vec<TestSpec>,
    /// Named attachment payloads referenced by tests.
    #[serde(default)]
    pub attachments: BTreeMap<String, Attachment>,
}

impl PluginManifest {
    /// Find the release with an exactly matching version tag.
    pub fn find_release(&self, version: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.version == version)
    }

    /// Find a test by name.
    pub fn find_test(&self, name: &str) -> Option<&TestSpec> {
        self.tests.iter().find(|t| t.name == name)
    }
}

/// One buildable release of a plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Opaque version tag (`"R70"`, `"1.2.1"`).
    pub version: String,
    #[serde(flatten)]
    pub source: SourceSpec,
    /// Per-platform dependency lists, resolved against the manifest's
    /// dependency catalogue.
    #[serde(default)]
    pub dependencies: RuleSet<Vec<DepRef>>,
    #[serde(default)]
    pub build: RuleSet<BuildRule>,
    /// Per-platform artifact path patterns, `{VAR}` placeholders allowed.
    #[serde(default)]
    pub artifacts: RuleSet<Vec<String>>,
}

/// Where a release or dependency version comes from.
///
/// `kind` is matched at build time so an unrecognized type fails the build
/// rather than manifest parsing; configs may carry entries for source types
/// this tool does not fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    /// Expected digest for tarballs, `algorithm:hex` form.
    pub hash: Option<String>,
    /// Ref to check out after a git clone.
    pub tag: Option<String>,
}

/// A named dependency in the catalogue, keyed by version tag.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyEntry {
    pub versions: HashMap<String, DependencyNode>,
}

/// One version of a dependency: its source, its own sub-dependencies, and
/// how to build it per platform.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyNode {
    #[serde(flatten)]
    pub source: SourceSpec,
    #[serde(default)]
    pub dependencies: RuleSet<Vec<DepRef>>,
    pub build: RuleSet<BuildRule>,
}

/// Reference to a catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepRef {
    pub name: String,
    pub version: String,
}

impl DepRef {
    pub fn key(&self) -> DepKey {
        DepKey::new(&self.name, &self.version)
    }
}

/// Build commands plus the env fragment they run under.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildRule {
    #[serde(default)]
    pub env: Env,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

/// A shell command, either bare or with an explicit working directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandEntry {
    Line(String),
    Detailed {
        cmd: String,
        #[serde(default)]
        cwd: Option<String>,
    },
}

impl CommandEntry {
    pub fn cmd(&self) -> &str {
        match self {
            CommandEntry::Line(cmd) => cmd,
            CommandEntry::Detailed { cmd, .. } => cmd,
        }
    }

    pub fn cwd(&self) -> Option<&str> {
        match self {
            CommandEntry::Line(_) => None,
            CommandEntry::Detailed { cwd, .. } => cwd.as_deref(),
        }
    }
}

/// A named test: which attachments it needs and what to run.
#[derive(Debug, Clone, Deserialize)]
pub struct TestSpec {
    pub name: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

/// An attachment payload a test can materialize on disk.
///
/// `path` is the target directory (placeholders allowed); the attachment's
/// map key is the filename written inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub path: String,
    pub encoding: String,
    pub data: String,
}

/// Path of a plugin's manifest under the plugins directory.
pub fn manifest_path(plugins_dir: &Path, name: &str) -> PathBuf {
    plugins_dir.join(name).join(format!("{name}.yml"))
}

/// Load and parse `plugins/<name>/<name>.yml`.
pub fn load_plugin_manifest(plugins_dir: &Path, name: &str) -> Result<PluginManifest> {
    let path = manifest_path(plugins_dir, name);
    if !path.exists() {
        bail!("plugin config not found: {}", path.display());
    }

    let contents = util::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse plugin config: {}", path.display()))
}

/// All plugin names under the plugins directory, sorted.
///
/// A plugin is any subdirectory following the `<name>/<name>.yml` manifest
/// convention; anything else is ignored.
pub fn list_plugins(plugins_dir: &Path) -> Result<Vec<String>> {
    let mut plugins = Vec::new();

    if !plugins_dir.exists() {
        return Ok(plugins);
    }

    for entry in std::fs::read_dir(plugins_dir)
        .with_context(|| format!("failed to read directory: {}", plugins_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if manifest_path(plugins_dir, &name).exists() {
            plugins.push(name);
        }
    }

    plugins.sort();
    Ok(plugins)
}
