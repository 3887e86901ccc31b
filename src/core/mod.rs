//! Core data structures for Slipway.
//!
//! This module contains the foundational types used throughout Slipway:
//! - Platform identifiers and pattern matching
//! - Dependency keys (name + version)
//! - Ordered platform rule sets
//! - Plugin manifests

pub mod dep_key;
pub mod manifest;
pub mod platform;
pub mod ruleset;

pub use dep_key::DepKey;
pub use manifest::{
    list_plugins, load_plugin_manifest, Attachment, BuildRule, CommandEntry, DepRef,
    DependencyEntry, DependencyNode, PluginManifest, Release, SourceSpec, TestSpec,
};
pub use platform::{matching_platforms, pattern_matches, runner_for, PLATFORMS};
pub use ruleset::RuleSet;
