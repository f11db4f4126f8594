//! `extplan config` command

use anyhow::{Context, Result};

use extplan::core::toggles::KNOBS;
use extplan::ops::resolve_plan::{resolve_environment, resolve_platform};
use extplan::util::diagnostic::{emit, Diagnostic};
use extplan::BuildConfiguration;

use crate::cli::ConfigArgs;
use crate::commands::resolve_options;

pub fn execute(args: ConfigArgs, color: bool) -> Result<()> {
    if args.knobs {
        for knob in KNOBS {
            let default = match knob.default {
                Some(value) => format!("{:?}", value),
                None => "unset".to_string(),
            };
            println!("{:<45} {:<10} {}", knob.var, default, knob.description);
        }
        return Ok(());
    }

    for (key, _) in &args.resolve.env {
        if !KNOBS.iter().any(|knob| knob.var == key.as_str()) {
            emit(
                &Diagnostic::warning(format!("`{}` is not a recognised build variable", key))
                    .with_suggestion("Run `extplan config --knobs` to list recognised variables"),
                color,
            );
        }
    }

    let opts = resolve_options(args.resolve, false)?;
    let raw = resolve_environment(&opts);
    let config = BuildConfiguration::resolve(&raw);
    let platform = resolve_platform(&opts);

    println!("# platform: {}", platform.platform_string());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("failed to render configuration")?
    );

    Ok(())
}
