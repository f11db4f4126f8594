//! extplan CLI - build plans for native extension modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use extplan::util::diagnostic::emit;
use extplan::PlanError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        match e.downcast_ref::<PlanError>() {
            Some(plan_err) => emit(&plan_err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("extplan=debug")
    } else {
        EnvFilter::new("extplan=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Config(args) => commands::config::execute(args, color),
        Commands::Flags(args) => commands::flags::execute(args),
        Commands::Stage(args) => commands::stage::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
