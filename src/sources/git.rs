//! Git source acquisition.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Repository, ResetType};

/// Version-control operations used during source acquisition.
pub trait VcsClient {
    /// Clone a repository into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Check out a tag, branch, or commit in an existing checkout.
    fn checkout(&self, dir: &Path, refname: &str) -> Result<()>;
}

/// Production client backed by libgit2.
pub struct GitClient;

impl VcsClient for GitClient {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("cloning {}", url);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Repository::clone(url, dest).with_context(|| format!("failed to clone {}", url))?;

        Ok(())
    }

    fn checkout(&self, dir: &Path, refname: &str) -> Result<()> {
        let repo = Repository::open(dir)
            .with_context(|| format!("failed to open git repository: {}", dir.display()))?;

        let object = repo
            .revparse_single(refname)
            .with_context(|| format!("unknown git reference `{}`", refname))?;
        let commit = object
            .peel_to_commit()
            .with_context(|| format!("`{}` does not point at a commit", refname))?;

        repo.reset(commit.as_object(), ResetType::Hard, None)
            .with_context(|| format!("failed to check out `{}`", refname))?;

        Ok(())
    }
}
