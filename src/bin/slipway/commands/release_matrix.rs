//! `slipway release-matrix` command

use anyhow::Result;
use slipway::ops::matrix::{append_ci_outputs, github_matrix, github_matrix_pretty};
use slipway::ops::release::release_matrix;
use slipway::util::Shell;

use crate::cli::ReleaseMatrixArgs;

pub fn execute(args: ReleaseMatrixArgs, shell: &Shell) -> Result<()> {
    let report = release_matrix(
        &args.build_results_dir,
        &args.test_results_dir,
        &args.base_test_matrix,
        shell,
    )?;

    if !report.skipped.is_empty() {
        shell.warn("skipping release for platforms with missing or failed tests:");
        for entry in &report.skipped {
            shell.note(format!(
                "{} {} ({})",
                entry.plugin, entry.version, entry.platform
            ));
        }
    }

    println!("{}", github_matrix_pretty(&report.entries)?);

    let has_releases = if report.entries.is_empty() { "false" } else { "true" };
    append_ci_outputs(
        &args.output,
        &[
            ("has-releases", has_releases),
            ("matrix", &github_matrix(&report.entries)?),
        ],
    )
}
