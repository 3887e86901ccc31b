//! Build context - platform, collaborators, and shared services.
//!
//! Everything the engine touches in the outside world (network, git,
//! subprocesses) sits behind a trait object on the context, so tests swap
//! in recording fakes and the graph logic stays deterministic.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::env::{AmbientEnv, Env};
use crate::builder::toolchain::Toolchains;
use crate::sources::{Downloader, GitClient, HttpDownloader, VcsClient};
use crate::util::process::ProcessBuilder;
use crate::util::shell::Shell;

/// Output of a captured command run.
#[derive(Debug)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs shell command lines.
pub trait CommandRunner {
    /// Run with inherited stdio; returns the exit code.
    fn run(&self, command: &str, cwd: &Path, env: &Env) -> Result<i32>;

    /// Run with stdout/stderr captured.
    fn run_captured(&self, command: &str, cwd: &Path, env: &Env) -> Result<CommandOutput>;
}

/// Production runner executing through `sh -c`.
pub struct ShellRunner;

impl ShellRunner {
    fn builder(command: &str, cwd: &Path, env: &Env) -> ProcessBuilder {
        let mut builder = ProcessBuilder::new("sh").arg("-c").arg(command).cwd(cwd);
        for (key, value) in env.iter() {
            builder = builder.env(key, value);
        }
        builder
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path, env: &Env) -> Result<i32> {
        let status = Self::builder(command, cwd, env).status()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn run_captured(&self, command: &str, cwd: &Path, env: &Env) -> Result<CommandOutput> {
        let output = Self::builder(command, cwd, env).exec()?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Shared services for one build or test invocation.
pub struct BuildContext {
    /// Concrete target platform identifier.
    pub platform: String,
    /// Directory holding plugin configs and `toolchains.yml`.
    pub plugins_dir: PathBuf,
    /// Parallelism handed to build tools via `NPROC`.
    pub nproc: usize,
    pub toolchains: Toolchains,
    /// Host env snapshot taken at startup.
    pub ambient: AmbientEnv,
    pub downloader: Box<dyn Downloader>,
    pub vcs: Box<dyn VcsClient>,
    pub runner: Box<dyn CommandRunner>,
    pub shell: Arc<Shell>,
}

impl BuildContext {
    /// Context wired to the real collaborators.
    pub fn new(
        platform: impl Into<String>,
        plugins_dir: impl Into<PathBuf>,
        nproc: usize,
        shell: Arc<Shell>,
    ) -> Self {
        let plugins_dir = plugins_dir.into();
        BuildContext {
            platform: platform.into(),
            toolchains: Toolchains::new(&plugins_dir),
            plugins_dir,
            nproc,
            ambient: AmbientEnv::capture(),
            downloader: Box::new(HttpDownloader::new(Arc::clone(&shell))),
            vcs: Box::new(GitClient),
            runner: Box::new(ShellRunner),
            shell,
        }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("platform", &self.platform)
            .field("plugins_dir", &self.plugins_dir)
            .field("nproc", &self.nproc)
            .finish_non_exhaustive()
    }
}
