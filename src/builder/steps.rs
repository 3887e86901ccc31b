//! Individual build steps - source acquisition and command execution.

use std::path::Path;

use anyhow::Result;

use crate::builder::context::{BuildContext, CommandRunner};
use crate::builder::env::{substitute, Env};
use crate::builder::errors::BuildError;
use crate::core::manifest::{CommandEntry, SourceSpec};
use crate::sources::{filename_from_url, Downloader, VcsClient};
use crate::util::hash;
use crate::util::shell::Status;

/// Fetch a node's source into the session working directory.
///
/// Tarballs are downloaded only when absent, then verified against the
/// declared checksum (a stale or tampered file on disk fails the same way a
/// bad download does). Git sources clone into `workdir/<name>` and check out
/// the declared ref only on a fresh clone. Returns the archive file name for
/// tarball sources so the caller can expose it as `DL_FILE_NAME`.
pub fn acquire_source(
    ctx: &BuildContext,
    workdir: &Path,
    name: &str,
    source: &SourceSpec,
) -> Result<Option<String>> {
    match source.kind.as_str() {
        "tarball" => {
            let filename = filename_from_url(&source.source)?;
            let dest = workdir.join(&filename);

            if !dest.exists() {
                ctx.downloader.fetch(&source.source, &dest)?;
            }

            if let Some(declared) = &source.hash {
                verify_archive(&dest, declared)?;
            }

            Ok(Some(filename))
        }
        "git" => {
            let dest = workdir.join(name);
            if !dest.exists() {
                ctx.shell.status(Status::Fetching, &source.source);
                ctx.vcs.clone_repo(&source.source, &dest)?;
                if let Some(tag) = &source.tag {
                    ctx.vcs.checkout(&dest, tag)?;
                }
            }
            Ok(None)
        }
        other => Err(BuildError::UnknownSourceType {
            kind: other.to_string(),
        }
        .into()),
    }
}

/// Check an archive against its declared `algorithm:digest`.
fn verify_archive(path: &Path, declared: &str) -> Result<()> {
    let (algorithm, expected) = hash::parse_checksum(declared)?;
    let actual = hash::file_digest(path, algorithm)?;

    if actual != expected {
        return Err(BuildError::HashMismatch {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }

    Ok(())
}

/// Fold a build rule's environment fragment into the session environment.
///
/// Values are substituted against the environment as it stood before the
/// fragment was applied, then accumulated key by key.
pub fn apply_rule_env(env: &mut Env, fragment: &Env) {
    let snapshot = env.clone();
    for (key, value) in fragment.iter() {
        let value = substitute(value, &snapshot);
        env.accumulate(key, &value);
    }
}

/// Run a build rule's command list.
///
/// The working directory is sticky: a `cwd` on one entry applies to the
/// following entries until overridden, starting at the session working
/// directory. Commands and directories go through `{VAR}` substitution
/// against the execution environment. The first non-zero exit aborts the
/// remaining commands.
pub fn run_build_commands(
    ctx: &BuildContext,
    workdir: &Path,
    commands: &[CommandEntry],
    exec_env: &Env,
) -> Result<()> {
    let mut current_cwd = workdir.display().to_string();

    for entry in commands {
        if let Some(cwd) = entry.cwd() {
            current_cwd = cwd.to_string();
        }

        let command = substitute(entry.cmd(), exec_env);
        let cwd = substitute(&current_cwd, exec_env);

        ctx.shell
            .status(Status::Running, format!("[{}]$ {}", cwd, command));

        let code = ctx.runner.run(&command, Path::new(&cwd), exec_env)?;
        if code != 0 {
            return Err(BuildError::CommandFailed { command, code }.into());
        }
    }

    Ok(())
}
