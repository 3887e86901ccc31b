//! Implementation of `slipway test`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;

use crate::builder::context::{BuildContext, CommandRunner};
use crate::builder::env::{substitute, Env};
use crate::builder::errors::BuildError;
use crate::core::manifest::{load_plugin_manifest, Attachment, TestSpec};
use crate::util::fs::{ensure_dir, glob_files, write_bytes, write_string};
use crate::util::shell::Status;

/// Options for the test command.
#[derive(Debug, Clone)]
pub struct TestOptions {
    /// Plugin name
    pub plugin: String,

    /// Plugin version under test (reporting only)
    pub version: String,

    /// Name of the test to run
    pub test_name: String,

    /// Explicit path to the built plugin file
    pub plugin_path: Option<PathBuf>,

    /// Directory to search for the plugin file when no explicit path is given
    pub artifact_dir: Option<PathBuf>,

    /// Test working directory
    pub testdir: PathBuf,
}

/// Outcome of one test run.
///
/// A failing test command is a result, not an engine error; engine errors
/// are reserved for configuration problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl TestOutcome {
    pub fn passed(self) -> bool {
        self == TestOutcome::Passed
    }
}

/// Run one named test against a built plugin.
pub fn run_plugin_test(ctx: &BuildContext, options: &TestOptions) -> Result<TestOutcome> {
    let plugin_path = resolve_plugin_path(ctx, options)?;

    ctx.shell.status(
        Status::Testing,
        format!(
            "{}: {} {} ({})",
            options.test_name, options.plugin, options.version, ctx.platform
        ),
    );

    let manifest = load_plugin_manifest(&ctx.plugins_dir, &options.plugin)?;
    let test = manifest
        .find_test(&options.test_name)
        .ok_or_else(|| BuildError::TestNotFound {
            plugin: options.plugin.clone(),
            test: options.test_name.clone(),
        })?;

    ensure_dir(&options.testdir)?;

    let env = Env::from_pairs([
        ("TESTDIR", options.testdir.display().to_string()),
        ("PLUGIN_PATH", plugin_path.display().to_string()),
    ]);

    materialize_attachments(ctx, &manifest.attachments, test, &env)?;

    run_test_commands(ctx, test, &options.testdir, &env)
}

/// Locate the plugin file: an explicit path wins, otherwise the artifact
/// directory is scanned for the platform's shared-library extension.
fn resolve_plugin_path(ctx: &BuildContext, options: &TestOptions) -> Result<PathBuf> {
    let path = match (&options.plugin_path, &options.artifact_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => plugin_path_for_platform(&ctx.platform, dir)?,
        (None, None) => bail!("either a plugin path or an artifact directory is required"),
    };

    if !path.exists() {
        bail!("plugin file not found: {}", path.display());
    }
    Ok(path)
}

/// Find the built plugin in an artifact directory by extension.
pub fn plugin_path_for_platform(platform: &str, artifact_dir: &Path) -> Result<PathBuf> {
    let pattern = if platform.starts_with("linux") {
        "*.so"
    } else if platform.starts_with("darwin") {
        "*.dylib"
    } else {
        bail!(
            "no plugin file found in {} for platform {}",
            artifact_dir.display(),
            platform
        );
    };

    let mut matches = glob_files(artifact_dir, &[pattern.to_string()])?;
    if matches.is_empty() {
        bail!(
            "no plugin file found in {} for platform {}",
            artifact_dir.display(),
            platform
        );
    }
    Ok(matches.remove(0))
}

/// Write the attachments a test declares.
///
/// Each attachment's `path` is a target directory (after substitution); the
/// map key is the filename created inside it.
fn materialize_attachments(
    ctx: &BuildContext,
    attachments: &BTreeMap<String, Attachment>,
    test: &TestSpec,
    env: &Env,
) -> Result<()> {
    if test.attachments.is_empty() {
        return Ok(());
    }

    let missing: Vec<String> = test
        .attachments
        .iter()
        .filter(|name| !attachments.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(BuildError::AttachmentsMissing { names: missing }.into());
    }

    for (filename, attachment) in attachments {
        if !test.attachments.contains(filename) {
            continue;
        }

        let dir = substitute(&attachment.path, env);
        let filepath = Path::new(&dir).join(filename);

        match attachment.encoding.as_str() {
            "text/utf-8" => {
                let content = substitute(&attachment.data, env);
                write_string(&filepath, &content)?;
            }
            "base64/gzip" => {
                let compressed = BASE64.decode(attachment.data.trim())?;
                let mut decoder = GzDecoder::new(&compressed[..]);
                let mut content = Vec::new();
                decoder.read_to_end(&mut content)?;
                write_bytes(&filepath, &content)?;
            }
            other => {
                return Err(BuildError::UnknownEncoding {
                    encoding: other.to_string(),
                }
                .into())
            }
        }

        ctx.shell
            .status(Status::Created, format!("attachment {}", filepath.display()));
    }

    Ok(())
}

/// Run the test's command list with captured output.
///
/// Unlike build commands the working directory is NOT sticky: each entry
/// without an explicit `cwd` runs in the test directory.
fn run_test_commands(
    ctx: &BuildContext,
    test: &TestSpec,
    testdir: &Path,
    env: &Env,
) -> Result<TestOutcome> {
    if test.commands.is_empty() {
        ctx.shell.warn("no test commands defined");
        return Ok(TestOutcome::Passed);
    }

    for entry in &test.commands {
        let cwd = entry
            .cwd()
            .map(str::to_string)
            .unwrap_or_else(|| testdir.display().to_string());

        let command = substitute(entry.cmd(), env);
        let cwd = substitute(&cwd, env);

        ctx.shell
            .status(Status::Running, format!("[{}]$ {}", cwd, command));

        let output = ctx.runner.run_captured(&command, Path::new(&cwd), env)?;
        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            eprint!("{}", output.stderr);
        }

        if !output.success() {
            ctx.shell
                .error(format!("command failed with exit code {}", output.code));
            return Ok(TestOutcome::Failed);
        }
    }

    Ok(TestOutcome::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_context, MockDownloader, RecordingRunner};
    use crate::util::fs::write_string as write_file;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_manifest(plugins_dir: &Path, name: &str, contents: &str) {
        write_file(
            &plugins_dir.join(name).join(format!("{name}.yml")),
            contents,
        )
        .unwrap();
    }

    fn gzip_base64(payload: &[u8]) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        BASE64.encode(encoder.finish().unwrap())
    }

    fn options(tmp: &TempDir, plugin_file: &Path) -> TestOptions {
        TestOptions {
            plugin: "foo".to_string(),
            version: "1.0".to_string(),
            test_name: "smoke".to_string(),
            plugin_path: Some(plugin_file.to_path_buf()),
            artifact_dir: None,
            testdir: tmp.path().join("testdir"),
        }
    }

    #[test]
    fn test_passing_run_with_attachments() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        let blob = gzip_base64(b"frame data");
        write_manifest(
            &plugins_dir,
            "foo",
            &format!(
                r#"
releases: []
tests:
  - name: smoke
    attachments:
      - check.py
      - sample.bin
    commands:
      - python3 {{TESTDIR}}/check.py
      - cmd: ls
        cwd: '{{TESTDIR}}/sub'
      - ls again
attachments:
  check.py:
    path: '{{TESTDIR}}'
    encoding: text/utf-8
    data: |
      load("{{PLUGIN_PATH}}")
  sample.bin:
    path: '{{TESTDIR}}/data'
    encoding: base64/gzip
    data: {blob}
"#
            ),
        );

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let runner = RecordingRunner::default();
        let mut ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        ctx.runner = Box::new(runner.clone());

        let opts = options(&tmp, &plugin_file);
        let outcome = run_plugin_test(&ctx, &opts).unwrap();
        assert!(outcome.passed());

        // text attachment was substituted, binary attachment decoded
        let script = std::fs::read_to_string(opts.testdir.join("check.py")).unwrap();
        assert_eq!(script.trim(), format!(r#"load("{}")"#, plugin_file.display()));
        let sample = std::fs::read(opts.testdir.join("data/sample.bin")).unwrap();
        assert_eq!(sample, b"frame data");

        // cwd is per-entry, not sticky
        let calls = runner.calls();
        assert_eq!(calls[0].cwd, opts.testdir);
        assert_eq!(calls[1].cwd, opts.testdir.join("sub"));
        assert_eq!(calls[2].cwd, opts.testdir);
        assert_eq!(calls[0].env.get("PLUGIN_PATH"), Some(plugin_file.display().to_string().as_str()));
    }

    #[test]
    fn test_failing_command_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(
            &plugins_dir,
            "foo",
            r#"
releases: []
tests:
  - name: smoke
    commands:
      - run-check
      - never-reached
"#,
        );

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let runner = RecordingRunner::default();
        runner.fail_on("run-check");
        let mut ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        ctx.runner = Box::new(runner.clone());

        let outcome = run_plugin_test(&ctx, &options(&tmp, &plugin_file)).unwrap();
        assert_eq!(outcome, TestOutcome::Failed);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_unknown_test_name() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(&plugins_dir, "foo", "releases: []\ntests: []\n");

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let err = run_plugin_test(&ctx, &options(&tmp, &plugin_file)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::TestNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_attachment_definition() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(
            &plugins_dir,
            "foo",
            r#"
releases: []
tests:
  - name: smoke
    attachments:
      - ghost.py
    commands:
      - run-check
"#,
        );

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let err = run_plugin_test(&ctx, &options(&tmp, &plugin_file)).unwrap_err();
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::AttachmentsMissing { names }) => {
                assert_eq!(names, &vec!["ghost.py".to_string()]);
            }
            other => panic!("expected missing attachments, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_encoding() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(
            &plugins_dir,
            "foo",
            r#"
releases: []
tests:
  - name: smoke
    attachments:
      - blob
    commands:
      - run-check
attachments:
  blob:
    path: '{TESTDIR}'
    encoding: base64/zstd
    data: aGVsbG8=
"#,
        );

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let err = run_plugin_test(&ctx, &options(&tmp, &plugin_file)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_no_commands_passes_with_warning() {
        let tmp = TempDir::new().unwrap();
        let plugins_dir = tmp.path().join("plugins");
        write_manifest(
            &plugins_dir,
            "foo",
            "releases: []\ntests:\n  - name: smoke\n",
        );

        let plugin_file = tmp.path().join("libfoo.so");
        std::fs::write(&plugin_file, b"").unwrap();

        let ctx = test_context(&plugins_dir, MockDownloader::new(b""));
        let outcome = run_plugin_test(&ctx, &options(&tmp, &plugin_file)).unwrap();
        assert!(outcome.passed());
    }

    #[test]
    fn test_plugin_path_detection() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("libfoo.so"), b"").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"").unwrap();

        let found = plugin_path_for_platform("linux-x86_64-glibc", tmp.path()).unwrap();
        assert_eq!(found, tmp.path().join("libfoo.so"));

        assert!(plugin_path_for_platform("darwin-aarch64", tmp.path()).is_err());
    }
}
