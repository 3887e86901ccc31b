//! Environment composition.
//!
//! Build commands run under an environment assembled from several sources
//! with different merge rules:
//!
//! - the per-platform base environment (`WORKDIR`, `PREFIXDIR`, pkg-config
//!   paths, cross-compilation file locations),
//! - the manifest's global env rules, where the LAST matching pattern wins
//!   per key,
//! - per-command env fragments, which ACCUMULATE (space-joined) so flag
//!   variables grow across steps instead of clobbering each other,
//! - the toolchain fold, applied per node with the same additive rule.
//!
//! `{VAR}` placeholders are expanded by [`substitute`] in a single pass;
//! values produced by substitution are never re-expanded.

use std::path::Path;

use anyhow::Result;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::builder::toolchain::Toolchains;
use crate::core::platform::pattern_matches;
use crate::core::ruleset::RuleSet;

/// An insertion-ordered variable map.
///
/// Order matters twice: substitution walks keys in insertion order, and
/// overwriting a key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    vars: Vec<(String, String)>,
}

impl Env {
    pub fn new() -> Self {
        Env { vars: Vec::new() }
    }

    /// Build an env from key/value pairs, mostly for tests and fixtures.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Env::new();
        for (key, value) in pairs {
            env.set(key.into(), value.into());
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.iter().any(|(k, _)| k == key)
    }

    /// Set a variable, overwriting in place so the key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Fold a value into a variable additively: an unset or empty variable
    /// takes the new value, otherwise the new value is appended after a
    /// space. An empty new value leaves the variable alone. This is how
    /// flag variables like `CFLAGS` collect contributions from several
    /// sources without clobbering each other.
    pub fn accumulate(&mut self, key: impl Into<String>, value: &str) {
        let key = key.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            None => self.vars.push((key, value.to_string())),
            Some((_, existing)) => {
                if existing.is_empty() {
                    *existing = value.to_string();
                } else if !value.is_empty() {
                    existing.push(' ');
                    existing.push_str(value);
                }
            }
        }
    }

    /// Iterate variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<'de> Deserialize<'de> for Env {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EnvVisitor;

        impl<'de> Visitor<'de> for EnvVisitor {
            type Value = Env;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of environment variables")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut env = Env::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    env.set(key, value);
                }
                Ok(env)
            }
        }

        deserializer.deserialize_map(EnvVisitor)
    }
}

/// Replace `{VAR}` placeholders in `text` with values from `env`.
///
/// One pass, in env insertion order: each key is textually replaced
/// throughout the intermediate result, so a value containing another
/// `{PLACEHOLDER}` survives literally unless a later key happens to match
/// it. Substitution never recurses into substituted values.
pub fn substitute(text: &str, env: &Env) -> String {
    let mut result = text.to_string();
    for (key, value) in env.iter() {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Fold the manifest's global env rules into `env` for one platform.
///
/// Every matching pattern is applied in declaration order and each key is
/// plainly overwritten, so when several patterns match, the last one wins
/// per key.
pub fn merge_global_env(env: &mut Env, global: &RuleSet<Env>, platform: &str) {
    for (pattern, fragment) in global.iter() {
        if pattern_matches(pattern, platform) {
            for (key, value) in fragment.iter() {
                env.set(key, value);
            }
        }
    }
}

/// Host process variables the composition reads.
///
/// Captured once at startup so the engine never consults `std::env` during
/// a build; tests inject whatever ambient state they need.
#[derive(Debug, Clone, Default)]
pub struct AmbientEnv {
    pub sysroot: Option<String>,
    pub pkg_config_path: Option<String>,
    pub path: Option<String>,
}

impl AmbientEnv {
    /// Snapshot the relevant variables from the host process.
    pub fn capture() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        AmbientEnv {
            sysroot: var("SYSROOT"),
            pkg_config_path: var("PKG_CONFIG_PATH"),
            path: var("PATH"),
        }
    }
}

/// Compose the base environment for one platform.
///
/// Sets `WORKDIR`, the platform-default `PREFIXDIR` (unless overridden),
/// propagates an ambient `SYSROOT`, derives `PKG_CONFIG_PATH` from the
/// prefix and sysroot, and merges in the cross-compilation file paths and
/// target triplet when the toolchain table knows the platform.
pub fn base_env(
    platform: &str,
    workdir: &Path,
    prefixdir: Option<&str>,
    ambient: &AmbientEnv,
    toolchains: &Toolchains,
) -> Result<Env> {
    let mut env = Env::new();
    env.set("WORKDIR", workdir.display().to_string());

    if let Some(prefix) = prefixdir {
        env.set("PREFIXDIR", prefix);
    } else if platform.starts_with("linux") {
        match &ambient.sysroot {
            Some(sysroot) => env.set("PREFIXDIR", format!("{sysroot}/usr/local")),
            None => env.set("PREFIXDIR", "/usr/local"),
        }
    } else if platform.starts_with("darwin-x86_64") {
        env.set("PREFIXDIR", "/usr/local");
    } else if platform.starts_with("darwin-aarch64") {
        env.set("PREFIXDIR", "/opt/homebrew");
    }

    if let Some(sysroot) = &ambient.sysroot {
        env.set("SYSROOT", sysroot);
    }

    let pkg_config = pkg_config_path(
        env.get("PREFIXDIR"),
        env.get("SYSROOT"),
        ambient.pkg_config_path.as_deref(),
    );
    if !pkg_config.is_empty() {
        env.set("PKG_CONFIG_PATH", pkg_config);
    }

    if let Some(meson) = toolchains.meson_cross_file(platform)? {
        env.set("MESON_CROSS_FILE", meson.display().to_string());
    }
    if let Some(cmake) = toolchains.cmake_toolchain_file(platform)? {
        env.set("CMAKE_TOOLCHAIN_FILE", cmake.display().to_string());
    }
    if let Some(triplet) = toolchains.triplet(platform)? {
        env.set("TARGET_TRIPLET", triplet);
    }

    Ok(env)
}

/// `PKG_CONFIG_PATH` entries for a prefix/sysroot pair: the prefix's
/// pkgconfig subdirectories, then the sysroot's, then whatever the host
/// already had, de-duplicated keeping the first occurrence.
fn pkg_config_path(prefix: Option<&str>, sysroot: Option<&str>, ambient: Option<&str>) -> String {
    let mut paths: Vec<String> = Vec::new();

    if let Some(prefix) = prefix {
        for subdir in [
            "lib/pkgconfig",
            "lib64/pkgconfig",
            "share/pkgconfig",
            "libdata/pkgconfig",
        ] {
            paths.push(format!("{prefix}/{subdir}"));
        }
    }

    if let Some(sysroot) = sysroot {
        for subdir in [
            "usr/lib/pkgconfig",
            "usr/lib64/pkgconfig",
            "usr/share/pkgconfig",
            "usr/libdata/pkgconfig",
        ] {
            paths.push(format!("{sysroot}/{subdir}"));
        }
    }

    if let Some(ambient) = ambient {
        paths.push(ambient.to_string());
    }

    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for path in paths {
        if !path.is_empty() && seen.insert(path.clone()) {
            ordered.push(path);
        }
    }

    ordered.join(":")
}
