//! Implementation of `slipway build`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;

use crate::builder::errors::BuildError;
use crate::builder::graph::{self, build_dependency};
use crate::builder::steps;
use crate::builder::{base_env, merge_global_env, substitute, BuildContext, BuildSession};
use crate::core::manifest::{load_plugin_manifest, PluginManifest, Release};
use crate::util::fs::ensure_dir;
use crate::util::shell::{format_duration, Status};

/// Options for the build command.
///
/// Platform and parallelism travel on the [`BuildContext`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Plugin name
    pub plugin: String,

    /// Release version to build
    pub version: String,

    /// Working directory for downloads, checkouts, and build trees
    pub workdir: PathBuf,

    /// Installation prefix override
    pub prefixdir: Option<String>,
}

/// Build one plugin release and return its artifact paths.
///
/// Dependencies declared by the release build first (depth-first, shared
/// session), then the plugin's own source is fetched and built, then every
/// declared artifact path is verified to exist.
pub fn build_plugin(ctx: &BuildContext, options: &BuildOptions) -> Result<Vec<String>> {
    let started = Instant::now();
    ctx.shell.status(
        Status::Building,
        format!(
            "{} {} for {}",
            options.plugin, options.version, ctx.platform
        ),
    );

    let manifest = load_plugin_manifest(&ctx.plugins_dir, &options.plugin)?;
    let release = find_release(&manifest, &options.plugin, &options.version)?;

    ensure_dir(&options.workdir)?;

    let mut env = base_env(
        &ctx.platform,
        &options.workdir,
        options.prefixdir.as_deref(),
        &ctx.ambient,
        &ctx.toolchains,
    )?;
    env.set("NPROC", ctx.nproc.to_string());
    merge_global_env(&mut env, &manifest.env, &ctx.platform);

    let mut session = BuildSession::new(&options.workdir, env);

    // Dependencies build before the plugin's own source is touched.
    if let Some(deps) = release.dependencies.select_for(&ctx.platform) {
        for dep in deps {
            build_dependency(ctx, &manifest.dependencies, &mut session, &dep.key())?;
        }
    }

    let workdir = session.workdir().to_path_buf();
    if let Some(filename) = steps::acquire_source(ctx, &workdir, &options.plugin, &release.source)?
    {
        session.env.set("DL_FILE_NAME", filename);
    }

    let rule = release
        .build
        .select_for(&ctx.platform)
        .ok_or_else(|| BuildError::NoBuildRule {
            platform: ctx.platform.clone(),
        })?
        .clone();
    graph::execute_rule(ctx, &mut session, &rule)?;

    let artifacts = collect_artifacts(ctx, &session, release)?;

    ctx.shell.status(
        Status::Finished,
        format!(
            "{} {} in {}",
            options.plugin,
            options.version,
            format_duration(started.elapsed())
        ),
    );

    Ok(artifacts)
}

fn find_release<'a>(
    manifest: &'a PluginManifest,
    plugin: &str,
    version: &str,
) -> Result<&'a Release> {
    manifest.find_release(version).ok_or_else(|| {
        let available: Vec<_> = manifest
            .releases
            .iter()
            .map(|r| r.version.as_str())
            .collect();
        BuildError::ReleaseNotFound {
            plugin: plugin.to_string(),
            version: version.to_string(),
            available: if available.is_empty() {
                None
            } else {
                Some(format!("available releases: {}", available.join(", ")))
            },
        }
        .into()
    })
}

/// Resolve artifact patterns against the post-build environment and verify
/// each path exists on disk.
fn collect_artifacts(
    ctx: &BuildContext,
    session: &BuildSession,
    release: &Release,
) -> Result<Vec<String>> {
    if release.artifacts.is_empty() {
        ctx.shell.warn("no artifacts defined");
        return Ok(Vec::new());
    }

    let patterns = release
        .artifacts
        .select_for(&ctx.platform)
        .cloned()
        .unwrap_or_default();

    let mut artifacts = Vec::new();
    for pattern in &patterns {
        let path = substitute(pattern, &session.env);
        if !Path::new(&path).exists() {
            return Err(BuildError::ArtifactMissing { path }.into());
        }
        artifacts.push(path);
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_context, MockDownloader, RecordingRunner};
    use crate::util::fs::write_string;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
env:
  .*:
    CFLAGS: '-O2'
releases:
  - version: '1.0'
    type: tarball
    source: https://example.com/foo-1.0.tar.gz
    dependencies:
      linux:
        - name: zlib
          version: '1.3'
    build:
      linux:
        env:
          LDFLAGS: '-L{PREFIXDIR}/lib'
        commands:
          - ./configure
          - cmd: make -j{NPROC}
          - make install
    artifacts:
      linux:
        - '{WORKDIR}/libfoo.so'
dependencies:
  zlib:
    versions:
      '1.3':
        type: git
        source: https://example.com/zlib.git
        build:
          linux:
            commands:
              - build-zlib
"#;

    fn write_manifest(plugins_dir: &Path, name: &str, contents: &str) {
        write_string(
            &plugins_dir.join(name).join(format!("{name}.yml")),
            contents,
        )
        .unwrap();
    }

    #[test]
    fn test_full_build_flow() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        let workdir = tmp.path().join("work");
        write_manifest(&plugins_dir, "foo", MANIFEST);

        let runner = RecordingRunner::default();
        runner.touch_on("make install", workdir.join("libfoo.so"));
        let mut ctx = test_context(&plugins_dir, MockDownloader::new(b"payload"));
        ctx.runner = Box::new(runner.clone());

        let options = BuildOptions {
            plugin: "foo".to_string(),
            version: "1.0".to_string(),
            workdir: workdir.clone(),
            prefixdir: None,
        };
        let artifacts = build_plugin(&ctx, &options).unwrap();

        assert_eq!(
            artifacts,
            vec![workdir.join("libfoo.so").display().to_string()]
        );

        let calls = runner.calls();
        let commands: Vec<_> = calls.iter().map(|c| c.command.clone()).collect();
        // dependency first, then the plugin's own steps
        assert_eq!(
            commands,
            vec!["build-zlib", "./configure", "make -j1", "make install"]
        );

        // global env and the rule fragment both reached the execution env
        let plugin_env = &calls[1].env;
        assert_eq!(plugin_env.get("CFLAGS"), Some("-O2"));
        assert_eq!(plugin_env.get("LDFLAGS"), Some("-L/usr/local/lib"));
        assert_eq!(plugin_env.get("NPROC"), Some("1"));
        assert_eq!(
            plugin_env.get("WORKDIR"),
            Some(workdir.display().to_string().as_str())
        );
        assert_eq!(plugin_env.get("DL_FILE_NAME"), Some("foo-1.0.tar.gz"));
    }

    #[test]
    fn test_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(&plugins_dir, "foo", MANIFEST);

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let options = BuildOptions {
            plugin: "foo".to_string(),
            version: "9.9".to_string(),
            workdir: tmp.path().join("work"),
            prefixdir: None,
        };
        let err = build_plugin(&ctx, &options).unwrap_err();

        match err.downcast_ref::<BuildError>() {
            Some(BuildError::ReleaseNotFound {
                plugin,
                version,
                available,
            }) => {
                assert_eq!(plugin, "foo");
                assert_eq!(version, "9.9");
                assert_eq!(available.as_deref(), Some("available releases: 1.0"));
            }
            other => panic!("expected release-not-found, got {:?}", other),
        }
    }

    #[test]
    fn test_no_build_rule_for_platform_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(&plugins_dir, "foo", MANIFEST);

        let mut ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        ctx.platform = "darwin-aarch64".to_string();

        let options = BuildOptions {
            plugin: "foo".to_string(),
            version: "1.0".to_string(),
            workdir: tmp.path().join("work"),
            prefixdir: None,
        };
        let err = build_plugin(&ctx, &options).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::NoBuildRule { .. })
        ));
    }

    #[test]
    fn test_missing_artifact_fails() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(&plugins_dir, "foo", MANIFEST);

        // runner never creates libfoo.so
        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let options = BuildOptions {
            plugin: "foo".to_string(),
            version: "1.0".to_string(),
            workdir: tmp.path().join("work"),
            prefixdir: None,
        };
        let err = build_plugin(&ctx, &options).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn test_no_artifacts_section_warns_and_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(
            &plugins_dir,
            "bare",
            r#"
releases:
  - version: '1.0'
    type: git
    source: https://example.com/bare.git
    build:
      .*:
        commands:
          - make
"#,
        );

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let options = BuildOptions {
            plugin: "bare".to_string(),
            version: "1.0".to_string(),
            workdir: tmp.path().join("work"),
            prefixdir: None,
        };
        let artifacts = build_plugin(&ctx, &options).unwrap();

        assert!(artifacts.is_empty());
    }
}
