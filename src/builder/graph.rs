//! Depth-first dependency builds with cycle detection.

use std::collections::HashMap;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::session::BuildSession;
use crate::builder::steps;
use crate::core::manifest::{BuildRule, DependencyEntry};
use crate::core::DepKey;
use crate::util::shell::Status;

/// Build one dependency node and everything beneath it.
///
/// The key is pushed onto the session's in-progress chain before any
/// catalogue lookup and popped on every exit path, so a failure deep in a
/// sub-tree leaves the chain consistent for the caller.
pub fn build_dependency(
    ctx: &BuildContext,
    catalogue: &HashMap<String, DependencyEntry>,
    session: &mut BuildSession,
    key: &DepKey,
) -> Result<()> {
    session.enter(key)?;
    let result = build_node(ctx, catalogue, session, key);
    session.leave(key);
    result
}

fn build_node(
    ctx: &BuildContext,
    catalogue: &HashMap<String, DependencyEntry>,
    session: &mut BuildSession,
    key: &DepKey,
) -> Result<()> {
    ctx.shell
        .status(Status::Building, format!("dependency {}", key));

    let entry = catalogue
        .get(key.name())
        .ok_or_else(|| BuildError::DependencyNotFound {
            name: key.name().to_string(),
        })?;
    let node = entry
        .versions
        .get(key.version())
        .ok_or_else(|| BuildError::VersionNotFound {
            name: key.name().to_string(),
            version: key.version().to_string(),
        })?;

    // Sub-dependencies build before this node's own source is touched.
    if let Some(deps) = node.dependencies.select_for(&ctx.platform) {
        for dep in deps {
            build_dependency(ctx, catalogue, session, &dep.key())?;
        }
    }

    let workdir = session.workdir().to_path_buf();
    if let Some(filename) = steps::acquire_source(ctx, &workdir, key.name(), &node.source)? {
        session.env.set("DL_FILE_NAME", filename);
    }

    let Some(rule) = node.build.select_for(&ctx.platform) else {
        ctx.shell.status(
            Status::Skipped,
            format!("{}: no build rule for {}", key, ctx.platform),
        );
        return Ok(());
    };
    // Clone releases the manifest borrow; the rule's env fragment feeds
    // back into the session env below.
    let rule = rule.clone();

    execute_rule(ctx, session, &rule)
}

/// Fold a build rule's env fragment into the session, then run its commands
/// under a per-node execution environment.
///
/// The toolchain fragment is folded into a transient copy, not the session
/// itself, so `--sysroot` flags do not pile up once per node.
pub fn execute_rule(
    ctx: &BuildContext,
    session: &mut BuildSession,
    rule: &BuildRule,
) -> Result<()> {
    steps::apply_rule_env(&mut session.env, &rule.env);

    let mut exec_env = session.env.clone();
    ctx.toolchains
        .update_env(&mut exec_env, &ctx.platform, ctx.ambient.path.as_deref())?;

    let workdir = session.workdir().to_path_buf();
    steps::run_build_commands(ctx, &workdir, &rule.commands, &exec_env)
}
