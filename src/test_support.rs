//! Shared test doubles for the build engine.
//!
//! The engine's collaborators (runner, downloader, vcs) are trait objects on
//! `BuildContext`; these fakes record invocations and fabricate effects on
//! disk so graph and coordinator logic is testable without network access or
//! real subprocesses.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::builder::context::{BuildContext, CommandOutput, CommandRunner};
use crate::builder::env::{AmbientEnv, Env};
use crate::builder::toolchain::Toolchains;
use crate::sources::{Downloader, VcsClient};
use crate::util::shell::{ColorChoice, Shell, Verbosity};

/// Context wired to quiet fakes; tests override individual collaborators.
pub fn test_context(plugins_dir: &Path, downloader: MockDownloader) -> BuildContext {
    BuildContext {
        platform: "linux-x86_64-glibc".to_string(),
        plugins_dir: plugins_dir.to_path_buf(),
        nproc: 1,
        toolchains: Toolchains::new(plugins_dir),
        ambient: AmbientEnv::default(),
        downloader: Box::new(downloader),
        vcs: Box::new(RecordingVcs::default()),
        runner: Box::new(RecordingRunner::default()),
        shell: Arc::new(Shell::new(Verbosity::Normal, ColorChoice::Never)),
    }
}

/// One recorded runner invocation.
#[derive(Debug, Clone)]
pub struct RunnerCall {
    pub command: String,
    pub cwd: PathBuf,
    pub env: Env,
}

/// A runner that records every invocation instead of spawning processes.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    inner: Arc<RunnerState>,
}

#[derive(Default)]
struct RunnerState {
    calls: Mutex<Vec<RunnerCall>>,
    fail_on: Mutex<Option<String>>,
    touch_on: Mutex<Vec<(String, PathBuf)>>,
    stdout_for: Mutex<Vec<(String, String)>>,
}

impl RecordingRunner {
    pub fn calls(&self) -> Vec<RunnerCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Make any command containing `needle` exit non-zero.
    pub fn fail_on(&self, needle: &str) {
        *self.inner.fail_on.lock().unwrap() = Some(needle.to_string());
    }

    /// Create `path` whenever a command containing `needle` runs, standing in
    /// for a build step that produces an artifact.
    pub fn touch_on(&self, needle: &str, path: impl Into<PathBuf>) {
        self.inner
            .touch_on
            .lock()
            .unwrap()
            .push((needle.to_string(), path.into()));
    }

    /// Script captured stdout for commands containing `needle`.
    pub fn stdout_for(&self, needle: &str, stdout: &str) {
        self.inner
            .stdout_for
            .lock()
            .unwrap()
            .push((needle.to_string(), stdout.to_string()));
    }

    fn record(&self, command: &str, cwd: &Path, env: &Env) -> i32 {
        self.inner.calls.lock().unwrap().push(RunnerCall {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            env: env.clone(),
        });

        for (needle, path) in self.inner.touch_on.lock().unwrap().iter() {
            if command.contains(needle.as_str()) {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(path, b"").unwrap();
            }
        }

        match &*self.inner.fail_on.lock().unwrap() {
            Some(needle) if command.contains(needle.as_str()) => 1,
            _ => 0,
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str, cwd: &Path, env: &Env) -> Result<i32> {
        Ok(self.record(command, cwd, env))
    }

    fn run_captured(&self, command: &str, cwd: &Path, env: &Env) -> Result<CommandOutput> {
        let code = self.record(command, cwd, env);
        let stdout = self
            .inner
            .stdout_for
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(CommandOutput {
            code,
            stdout,
            stderr: String::new(),
        })
    }
}

/// A downloader that writes a fixed payload instead of hitting the network.
#[derive(Clone)]
pub struct MockDownloader {
    payload: Arc<Vec<u8>>,
    fetches: Arc<AtomicUsize>,
}

impl MockDownloader {
    pub fn new(payload: &[u8]) -> Self {
        MockDownloader {
            payload: Arc::new(payload.to_vec()),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Downloader for MockDownloader {
    fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        crate::util::fs::write_bytes(dest, &self.payload)
    }
}

/// A VCS client that fabricates checkouts as empty directories.
#[derive(Clone, Default)]
pub struct RecordingVcs {
    inner: Arc<VcsState>,
}

#[derive(Default)]
struct VcsState {
    clones: AtomicUsize,
    checkouts: Mutex<Vec<String>>,
}

impl RecordingVcs {
    pub fn clones(&self) -> usize {
        self.inner.clones.load(Ordering::SeqCst)
    }

    pub fn checkouts(&self) -> Vec<String> {
        self.inner.checkouts.lock().unwrap().clone()
    }
}

impl VcsClient for RecordingVcs {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<()> {
        self.inner.clones.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(dest)?;
        Ok(())
    }

    fn checkout(&self, _dir: &Path, refname: &str) -> Result<()> {
        self.inner.checkouts.lock().unwrap().push(refname.to_string());
        Ok(())
    }
}
