//! Source staging.
//!
//! Copies the public headers and the protoc plugin sources into the build
//! tree so a packaged source distribution carries everything it compiles.
//! A stamp file records that staging completed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::fs::{copy_dir_all, write_string};

/// Stamp written once every tree is staged.
pub const STAMP_NAME: &str = "grpc_root_copied.stamp";

/// Staged directory name under the build directory.
pub const STAGED_ROOT: &str = "grpc_root";

/// Trees to stage, relative to the source root.
pub const STAGED_TREES: [&str; 2] = ["include", "src/compiler"];

/// Outcome of a successful staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Trees copied, as destination paths
    pub staged: Vec<PathBuf>,
    /// Number of files copied
    pub files: usize,
    /// Stamp file path
    pub stamp: PathBuf,
}

/// Copy the staged trees from `source_root` into `build_dir/grpc_root`.
///
/// A missing or uncopyable tree is reported and skipped, and the stamp is
/// only written when every tree was staged.
pub fn stage(source_root: &Path, build_dir: &Path) -> Result<StageReport> {
    let staged_root = build_dir.join(STAGED_ROOT);
    let mut staged = Vec::new();
    let mut files = 0;

    for tree in STAGED_TREES {
        let src = source_root.join(tree);
        let dst = staged_root.join(tree);

        if !src.is_dir() {
            tracing::warn!("{} does not exist, skipping", src.display());
            continue;
        }

        match copy_dir_all(&src, &dst) {
            Ok(count) => {
                tracing::debug!("staged {} files from {}", count, src.display());
                files += count;
                staged.push(dst);
            }
            Err(e) => tracing::warn!("failed to stage {}: {:#}", src.display(), e),
        }
    }

    if staged.len() != STAGED_TREES.len() {
        bail!(
            "staged {} of {} source trees into {}; not writing {}",
            staged.len(),
            STAGED_TREES.len(),
            staged_root.display(),
            STAMP_NAME
        );
    }

    let stamp = build_dir.join(STAMP_NAME);
    write_string(&stamp, "")?;
    tracing::info!("staged {} files into {}", files, staged_root.display());

    Ok(StageReport {
        staged,
        files,
        stamp,
    })
}
