//! Cross-compilation toolchain table.
//!
//! `toolchains.yml` next to the plugin configs maps platforms to their
//! cross toolchain: target triplet, sysroot, per-tool binary paths, and
//! generated meson/cmake description files. Platforms absent from the
//! table build with the host tools; a missing table is normal and only
//! warned about.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::builder::env::Env;
use crate::util;

/// Lazily loaded view of `toolchains.yml`.
///
/// Owned by the build context and parsed on first access, once per
/// invocation. A parse failure is reported on every access rather than
/// cached, so only a good table ever sticks.
#[derive(Debug)]
pub struct Toolchains {
    plugins_dir: PathBuf,
    table: OnceLock<HashMap<String, ToolchainSpec>>,
}

/// One platform's toolchain description.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSpec {
    /// Target triplet passed to `configure --host` style switches.
    pub triplet: Option<String>,
    /// Directory holding the cross tools, prepended to `PATH`.
    pub bin_path: Option<String>,
    /// Sysroot the compilers should target.
    pub sysroot: Option<String>,
    /// Logical tool name (`cc`, `cxx`, `ar`, ...) to executable path;
    /// exported uppercased (`CC=`, `CXX=`, ...).
    #[serde(default)]
    pub binaries: Env,
    #[serde(default)]
    pub files: ToolchainFiles,
}

/// Generated build-system description files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolchainFiles {
    pub meson: Option<String>,
    pub cmake: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolchainsFile {
    #[serde(default)]
    toolchains: HashMap<String, ToolchainSpec>,
}

impl Toolchains {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Toolchains {
            plugins_dir: plugins_dir.into(),
            table: OnceLock::new(),
        }
    }

    fn table(&self) -> Result<&HashMap<String, ToolchainSpec>> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }
        let loaded = self.load()?;
        Ok(self.table.get_or_init(|| loaded))
    }

    fn load(&self) -> Result<HashMap<String, ToolchainSpec>> {
        let path = self.plugins_dir.join("toolchains.yml");
        if !path.exists() {
            tracing::warn!("toolchains.yml not found at {}", path.display());
            return Ok(HashMap::new());
        }

        let contents = util::fs::read_to_string(&path)?;
        let file: ToolchainsFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))?;
        Ok(file.toolchains)
    }

    /// The toolchain entry for a platform, if the table has one.
    pub fn spec(&self, platform: &str) -> Result<Option<&ToolchainSpec>> {
        Ok(self.table()?.get(platform))
    }

    /// Target triplet for a platform.
    pub fn triplet(&self, platform: &str) -> Result<Option<&str>> {
        Ok(self.spec(platform)?.and_then(|s| s.triplet.as_deref()))
    }

    /// Cross tool directory, `~` expanded.
    pub fn bin_path(&self, platform: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .spec(platform)?
            .and_then(|s| s.bin_path.as_deref())
            .map(util::fs::expand_home))
    }

    /// Sysroot path, `~` expanded.
    pub fn sysroot(&self, platform: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .spec(platform)?
            .and_then(|s| s.sysroot.as_deref())
            .map(util::fs::expand_home))
    }

    /// Meson cross file for a platform, if configured and present on disk.
    pub fn meson_cross_file(&self, platform: &str) -> Result<Option<PathBuf>> {
        let file = self.spec(platform)?.and_then(|s| s.files.meson.as_deref());
        Ok(file.and_then(|f| self.existing_file(f)))
    }

    /// CMake toolchain file for a platform, if configured and present on disk.
    pub fn cmake_toolchain_file(&self, platform: &str) -> Result<Option<PathBuf>> {
        let file = self.spec(platform)?.and_then(|s| s.files.cmake.as_deref());
        Ok(file.and_then(|f| self.existing_file(f)))
    }

    /// Resolve a configured file path: relative paths hang off the project
    /// root (the plugins directory's parent), and the file must exist.
    fn existing_file(&self, configured: &str) -> Option<PathBuf> {
        let path = Path::new(configured);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let root = self.plugins_dir.parent().unwrap_or(Path::new(""));
            root.join(path)
        };
        resolved.exists().then_some(resolved)
    }

    /// Environment fragment for a platform's cross tools: each binary
    /// uppercased as a variable, plus `SYSROOT` and `--sysroot` compile and
    /// link flags when a sysroot is configured.
    pub fn env_vars(&self, platform: &str) -> Result<Env> {
        let mut env = Env::new();
        let Some(spec) = self.spec(platform)? else {
            return Ok(env);
        };

        for (name, path) in spec.binaries.iter() {
            env.set(name.to_uppercase(), path);
        }

        if let Some(sysroot) = self.sysroot(platform)? {
            let sysroot = sysroot.display().to_string();
            let flag = format!("--sysroot={sysroot}");
            env.set("SYSROOT", &sysroot);
            env.set("CFLAGS", &flag);
            env.set("CXXFLAGS", &flag);
            env.set("LDFLAGS", flag);
        }

        Ok(env)
    }

    /// Fold the toolchain fragment into an execution environment.
    ///
    /// Tool variables and flags accumulate additively, so declared build
    /// flags keep their values with the sysroot flags appended. The cross
    /// tool directory lands in front of `PATH` to shadow host tools.
    pub fn update_env(
        &self,
        env: &mut Env,
        platform: &str,
        ambient_path: Option<&str>,
    ) -> Result<()> {
        for (key, value) in self.env_vars(platform)?.iter() {
            env.accumulate(key, value);
        }

        if let Some(bin) = self.bin_path(platform)? {
            let bin = bin.display().to_string();
            let current = env
                .get("PATH")
                .map(str::to_string)
                .or_else(|| ambient_path.map(str::to_string));
            let merged = match current {
                Some(path) if !path.is_empty() => format!("{bin}:{path}"),
                _ => bin,
            };
            env.set("PATH", merged);
        }

        Ok(())
    }
}
