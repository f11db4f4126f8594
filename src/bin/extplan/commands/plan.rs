//! `extplan plan` command

use anyhow::Result;

use extplan::ops::resolve_plan;
use extplan::util::fs::write_string;
use extplan::BuildPlan;

use crate::cli::{OutputFormat, PlanArgs};
use crate::commands::resolve_options;

pub fn execute(args: PlanArgs) -> Result<()> {
    let opts = resolve_options(args.resolve, true)?;
    let plan = resolve_plan(&opts)?;

    let rendered = match args.format {
        OutputFormat::Json => plan.to_json()?,
        OutputFormat::Text => render_text(&plan),
    };

    match args.output {
        Some(path) => {
            write_string(&path, &rendered)?;
            tracing::info!("wrote plan to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn render_text(plan: &BuildPlan) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {} on {}\n",
        plan.package.name, plan.package.version, plan.platform
    ));
    output.push_str(&format!("assembly: {:?}\n", plan.assembly.outcome));
    let codegen = if plan.codegen.regenerate {
        "regenerate from templates"
    } else {
        "use generated sources"
    };
    output.push_str(&format!("codegen: {}\n", codegen));
    for (key, value) in &plan.environment {
        output.push_str(&format!("env: {}={}\n", key, value));
    }

    for module in &plan.modules {
        output.push_str(&format!("\n[{}]\n", module.name));
        output.push_str(&format!("  sources: {}\n", module.sources.len()));
        output.push_str(&format!("  include dirs: {}\n", module.include_dirs.len()));
        output.push_str(&format!("  macros: {}\n", module.define_macros.len()));
        output.push_str(&format!("  libraries: {}\n", module.libraries.join(" ")));
        if !module.extra_objects.is_empty() {
            let objects: Vec<String> = module
                .extra_objects
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            output.push_str(&format!("  extra objects: {}\n", objects.join(" ")));
        }
    }

    output.push_str(&format!("\nfingerprint: {}", plan.fingerprint));
    output
}
