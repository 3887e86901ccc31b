//! Per-invocation build state.

use std::path::{Path, PathBuf};

use crate::builder::env::Env;
use crate::builder::errors::BuildError;
use crate::core::DepKey;

/// Mutable state scoped to one top-level build: the working directory, the
/// environment every node composes against, and the chain of dependencies
/// currently being built.
///
/// The chain is kept in visitation order because it IS the error message
/// when a cycle turns up. Depths are small enough that a linear scan beats
/// carrying a separate set.
#[derive(Debug)]
pub struct BuildSession {
    workdir: PathBuf,
    pub env: Env,
    in_progress: Vec<DepKey>,
}

impl BuildSession {
    pub fn new(workdir: impl Into<PathBuf>, env: Env) -> Self {
        BuildSession {
            workdir: workdir.into(),
            env,
            in_progress: Vec::new(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Mark a dependency as being built.
    ///
    /// Fails if the key is already on the chain; the reported chain is the
    /// visitation order with the repeating key appended, so `a -> b -> a`
    /// reads exactly as the graph walked it. Every successful `enter` must
    /// be paired with [`leave`](Self::leave) on all exit paths.
    pub fn enter(&mut self, key: &DepKey) -> Result<(), BuildError> {
        if self.in_progress.contains(key) {
            let mut chain = self.in_progress.clone();
            chain.push(key.clone());
            return Err(BuildError::Cycle { chain });
        }
        self.in_progress.push(key.clone());
        Ok(())
    }

    /// Unmark a dependency after its node finishes, successfully or not.
    pub fn leave(&mut self, key: &DepKey) {
        if let Some(pos) = self.in_progress.iter().rposition(|k| k == key) {
            self.in_progress.remove(pos);
        }
    }

    /// The chain of dependencies currently being built, outermost first.
    pub fn in_progress(&self) -> &[DepKey] {
        &self.in_progress
    }
}
