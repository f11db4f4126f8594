//! `extplan stage` command

use anyhow::{anyhow, Result};

use extplan::ops::stage;
use extplan::util::diagnostic::suggestions;

use crate::cli::StageArgs;

pub fn execute(args: StageArgs) -> Result<()> {
    let report = stage(&args.source_root, &args.build_dir)
        .map_err(|e| anyhow!("{:#}\n{}", e, suggestions::STAGE_FAILED))?;

    for dir in &report.staged {
        println!("staged {}", dir.display());
    }
    println!("stamp {}", report.stamp.display());

    Ok(())
}
