//! Shared utilities

pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use process::ProcessBuilder;
pub use shell::{Shell, Status};
