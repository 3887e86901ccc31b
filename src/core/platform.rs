//! Platform identifiers and pattern matching.
//!
//! Configuration sections are keyed by regular-expression patterns that are
//! matched against a fixed set of platform identifiers. Matching is anchored
//! at the start of the identifier, so `linux-.*` matches both glibc and musl
//! targets while `x86_64` matches nothing.

use anyhow::{bail, Result};
use regex::Regex;

/// Every platform a plugin can be built for.
///
/// Order matters: matrix expansion reports platforms in this order before
/// sorting, and tests rely on it being stable.
pub const PLATFORMS: [&str; 4] = [
    "linux-x86_64-glibc",
    "linux-x86_64-musl",
    "darwin-x86_64",
    "darwin-aarch64",
];

/// Check whether a config pattern matches a platform identifier.
///
/// The pattern is a regular expression required to match starting at the
/// first byte of the identifier (a prefix match, not a full match). A
/// pattern that fails to compile matches nothing.
pub fn pattern_matches(pattern: &str, platform: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.find(platform).is_some_and(|m| m.start() == 0),
        Err(_) => false,
    }
}

/// All known platforms matching a pattern, in declaration order.
pub fn matching_platforms(pattern: &str) -> Vec<&'static str> {
    PLATFORMS
        .iter()
        .copied()
        .filter(|p| pattern_matches(pattern, p))
        .collect()
}

/// The CI runner label that builds a platform.
pub fn runner_for(platform: &str) -> Result<&'static str> {
    if platform.starts_with("linux") {
        Ok("ubuntu-24.04")
    } else if platform.starts_with("darwin") {
        if platform.contains("aarch64") {
            Ok("macos-15")
        } else {
            Ok("macos-15-intel")
        }
    } else {
        bail!("unknown platform: {platform}")
    }
}
