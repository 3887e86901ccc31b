//! `slipway record-build` command

use anyhow::{ensure, Result};
use slipway::ops::record::{record_build, ResultRecord};
use slipway::util::{Shell, Status};

use crate::cli::RecordBuildArgs;

pub fn execute(args: RecordBuildArgs, shell: &Shell) -> Result<()> {
    // CI passes unset workflow inputs through as empty strings.
    ensure!(
        !args.result_file.as_os_str().is_empty(),
        "a result file is required (set --result-file or RESULT_FILE)"
    );

    let record = ResultRecord::build(
        args.plugin,
        args.version,
        args.platform,
        args.runner,
        args.status,
    );
    record_build(&record, &args.result_file)?;

    shell.status(
        Status::Created,
        format!("build record {}", args.result_file.display()),
    );
    Ok(())
}
