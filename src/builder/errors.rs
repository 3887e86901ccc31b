//! Build error types and diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::DepKey;

/// Everything that can stop a build.
///
/// All of these are fatal: nothing is retried, and the failing node aborts
/// the whole invocation. Situations the engine deliberately tolerates (no
/// build rule for a dependency on this platform, no artifacts section) are
/// logged skips, not errors.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("version `{version}` not found for plugin `{plugin}`")]
    #[diagnostic(code(slipway::config::release_not_found))]
    ReleaseNotFound {
        plugin: String,
        version: String,
        #[help]
        available: Option<String>,
    },

    #[error("dependency `{name}` not found in dependencies section")]
    #[diagnostic(
        code(slipway::config::dependency_not_found),
        help("every name used in a release's dependency list needs an entry in the manifest's `dependencies` catalogue")
    )]
    DependencyNotFound { name: String },

    #[error("version `{version}` not found for dependency `{name}`")]
    #[diagnostic(code(slipway::config::version_not_found))]
    VersionNotFound { name: String, version: String },

    #[error("unknown source type: {kind}")]
    #[diagnostic(
        code(slipway::config::unknown_source_type),
        help("supported source types are `tarball` and `git`")
    )]
    UnknownSourceType { kind: String },

    #[error("hash verification failed for {file}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(slipway::fetch::hash_mismatch),
        help("delete the file to force a fresh download, or update the manifest hash")
    )]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("dependency cycle detected: {}", chain_display(.chain))]
    #[diagnostic(code(slipway::graph::cycle))]
    Cycle { chain: Vec<DepKey> },

    #[error("command failed with exit code {code}: {command}")]
    #[diagnostic(code(slipway::build::command_failed))]
    CommandFailed { command: String, code: i32 },

    #[error("artifact not found: {path}")]
    #[diagnostic(code(slipway::build::artifact_missing))]
    ArtifactMissing { path: String },

    #[error("no build configuration for platform {platform}")]
    #[diagnostic(
        code(slipway::build::no_build_rule),
        help("add a build rule whose pattern matches `{platform}` to the release")
    )]
    NoBuildRule { platform: String },

    #[error("test `{test}` not found for plugin `{plugin}`")]
    #[diagnostic(code(slipway::config::test_not_found))]
    TestNotFound { plugin: String, test: String },

    #[error("missing attachment configurations: {}", .names.join(", "))]
    #[diagnostic(code(slipway::config::attachments_missing))]
    AttachmentsMissing { names: Vec<String> },

    #[error("unsupported encoding: {encoding}")]
    #[diagnostic(
        code(slipway::config::unknown_encoding),
        help("supported encodings are `text/utf-8` and `base64/gzip`")
    )]
    UnknownEncoding { encoding: String },
}

/// Render a cycle chain as `a@1 -> b@2 -> a@1`.
fn chain_display(chain: &[DepKey]) -> String {
    chain
        .iter()
        .map(DepKey::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
