//! `extplan flags` command

use anyhow::Result;

use extplan::ops::resolve;

use crate::cli::FlagsArgs;
use crate::commands::resolve_options;

pub fn execute(args: FlagsArgs) -> Result<()> {
    let opts = resolve_options(args.resolve, true)?;
    let plan = resolve(&opts)?.plan()?;

    for module in &plan.modules {
        if !args.link {
            println!("# Compile flags for `{}`:", module.name);
            for dir in &module.include_dirs {
                println!("  -I{}", dir.display());
            }
            for define in module.define_macros.iter() {
                println!("  {}", define.to_flag());
            }
            for flag in &module.extra_compile_args {
                println!("  {}", flag);
            }
        }

        if !args.compile {
            println!("# Link flags for `{}`:", module.name);
            for flag in &module.extra_link_args {
                println!("  {}", flag);
            }
            for object in &module.extra_objects {
                println!("  {}", object.display());
            }
            for lib in &module.libraries {
                println!("  -l{}", lib);
            }
        }
    }

    for (key, value) in &plan.environment {
        println!("# export {}={}", key, value);
    }

    Ok(())
}
