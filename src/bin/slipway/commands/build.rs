//! `slipway build` command

use std::sync::Arc;

use anyhow::Result;
use slipway::builder::BuildContext;
use slipway::ops::slipway_build::{build_plugin, BuildOptions};
use slipway::util::Shell;

use crate::cli::BuildArgs;

pub fn execute(args: BuildArgs, shell: Arc<Shell>) -> Result<()> {
    let nproc = args.nproc.unwrap_or_else(default_nproc);
    let ctx = BuildContext::new(args.platform, args.plugins_dir, nproc, shell);

    let opts = BuildOptions {
        plugin: args.plugin,
        version: args.version,
        workdir: args.workdir,
        prefixdir: args.prefixdir,
    };

    let artifacts = build_plugin(&ctx, &opts)?;

    // Artifact paths go to stdout, one per line; everything else the build
    // prints goes to stderr.
    for artifact in &artifacts {
        println!("{artifact}");
    }

    Ok(())
}

fn default_nproc() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
