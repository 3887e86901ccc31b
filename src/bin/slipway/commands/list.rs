//! `slipway list` command

use anyhow::Result;
use slipway::core::manifest::list_plugins;

use crate::cli::ListArgs;

pub fn execute(args: ListArgs) -> Result<()> {
    for plugin in list_plugins(&args.plugins_dir)? {
        println!("{plugin}");
    }
    Ok(())
}
