//! Slipway - a declarative build driver for cross-platform native plugins
//!
//! This crate provides the core library functionality for Slipway: plugin
//! manifests, platform-pattern rules, environment composition, the
//! dependency build graph, and the CI matrix/record operations behind the
//! `slipway` binary.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test doubles for Slipway unit tests.
///
/// Only compiled under `cfg(test)`; provides recording fakes for process
/// execution, downloads, and git operations.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{DepKey, PluginManifest, RuleSet};
pub use crate::builder::{BuildContext, BuildError, BuildSession, Env};
pub use crate::util::Shell;
