//! Command implementations

pub mod build;
pub mod completions;
pub mod list;
pub mod matrix;
pub mod record_build;
pub mod release_matrix;
