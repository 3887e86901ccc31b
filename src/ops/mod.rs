//! High-level operations.
//!
//! This module contains the implementation of slipway commands.

pub mod matrix;
pub mod record;
pub mod release;
pub mod slipway_build;
pub mod slipway_test;

pub use matrix::{
    append_ci_outputs, build_matrix, filter_test_matrix, github_matrix, github_matrix_pretty,
    load_matrix_file, matrix_json, test_matrix, MatrixEntry,
};
pub use record::{load_records, record_build, record_test, ResultRecord};
pub use release::{release_matrix, ReleaseEntry, ReleaseReport};
pub use slipway_build::{build_plugin, BuildOptions};
pub use slipway_test::{plugin_path_for_platform, run_plugin_test, TestOptions, TestOutcome};
