//! Command implementations

pub mod completions;
pub mod config;
pub mod flags;
pub mod plan;
pub mod stage;

use anyhow::{bail, Result};

use extplan::ops::ResolveOptions;
use extplan::util::diagnostic::suggestions;

use crate::cli::ResolveArgs;

/// Turn shared CLI arguments into resolution options.
///
/// Commands that read the catalog require the manifest to exist.
pub fn resolve_options(args: ResolveArgs, require_manifest: bool) -> Result<ResolveOptions> {
    if require_manifest && !args.manifest.is_file() {
        bail!(
            "catalog manifest not found: {}\n{}",
            args.manifest.display(),
            suggestions::NO_MANIFEST
        );
    }

    let mut opts = ResolveOptions::new(args.manifest);
    opts.env_overrides = args.env;
    opts.os = args.os;
    opts.arch = args.arch;
    opts.probe = !args.no_probe;
    Ok(opts)
}
