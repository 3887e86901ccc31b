//! Plugin build engine.
//!
//! This module implements environment composition, dependency-graph
//! traversal, and build-command execution.

pub mod context;
pub mod env;
pub mod errors;
pub mod graph;
pub mod session;
pub mod steps;
pub mod toolchain;

pub use context::{BuildContext, CommandOutput, CommandRunner, ShellRunner};
pub use env::{base_env, merge_global_env, substitute, AmbientEnv, Env};
pub use errors::BuildError;
pub use graph::build_dependency;
pub use session::BuildSession;
pub use toolchain::Toolchains;
