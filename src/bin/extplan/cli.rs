//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// extplan - resolve build plans for native Python extensions over gRPC core
#[derive(Parser)]
#[command(name = "extplan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and print the extension build plan
    Plan(PlanArgs),

    /// Show the resolved build configuration
    Config(ConfigArgs),

    /// Show macros, include paths and compiler/linker flags
    Flags(FlagsArgs),

    /// Copy headers and compiler sources into the build tree
    Stage(StageArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by every command that resolves a plan.
#[derive(Args)]
pub struct ResolveArgs {
    /// Path to the catalog manifest
    #[arg(long, env = "EXTPLAN_MANIFEST", default_value = "extplan.toml")]
    pub manifest: PathBuf,

    /// Set a build variable (KEY=VALUE), overriding config files and the environment
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Resolve for this OS instead of the host (linux, macos, windows, freebsd, ...)
    #[arg(long)]
    pub os: Option<String>,

    /// Resolve for this CPU architecture instead of the host
    #[arg(long)]
    pub arch: Option<String>,

    /// Skip the toolchain link probe
    #[arg(long)]
    pub no_probe: bool,
}

fn parse_env_pair(pair: &str) -> Result<(String, String), String> {
    extplan::util::config::parse_env_pair(pair).map_err(|e| e.to_string())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the plan to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// List recognised build variables and their defaults
    #[arg(long)]
    pub knobs: bool,
}

#[derive(Args)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Show compile flags only
    #[arg(long)]
    pub compile: bool,

    /// Show link flags only
    #[arg(long)]
    pub link: bool,
}

#[derive(Args)]
pub struct StageArgs {
    /// Repository root holding `include` and `src/compiler`
    #[arg(long, default_value = ".")]
    pub source_root: PathBuf,

    /// Build directory to stage into
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
