//! `slipway matrix` command

use anyhow::Result;
use slipway::ops::matrix::{build_matrix, github_matrix, matrix_json, test_matrix};
use slipway::util::Shell;

use crate::cli::{MatrixArgs, MatrixType, OutputFormat};

pub fn execute(args: MatrixArgs, shell: &Shell) -> Result<()> {
    let entries = match args.matrix_type {
        MatrixType::Build => build_matrix(&args.plugins_dir, &args.plugins, shell)?,
        MatrixType::Test => test_matrix(&args.plugins_dir, &args.plugins, shell)?,
    };

    let rendered = match args.output {
        OutputFormat::Json => matrix_json(&entries)?,
        OutputFormat::Github => github_matrix(&entries)?,
    };
    println!("{rendered}");

    Ok(())
}
