//! System library discovery.
//!
//! Some system packages (abseil in particular) ship one shared library per
//! component, so the set of names to link is read off the filesystem.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Finds installed libraries by glob pattern.
pub trait LibraryDiscovery {
    /// Linkable names of libraries matching `pattern`.
    ///
    /// A pattern that matches nothing yields an empty set.
    fn discover(&self, pattern: &str) -> BTreeSet<String>;
}

/// Derive the linkable name of a library file: strip the directory, the
/// extension and a leading `lib`.
///
/// `/usr/lib64/libabsl_strings.so` becomes `absl_strings`.
pub fn linkable_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = stem.strip_prefix("lib").unwrap_or(&stem);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Discovers libraries by globbing below a root directory.
#[derive(Debug, Clone)]
pub struct GlobLibraryDiscovery {
    root: PathBuf,
}

impl GlobLibraryDiscovery {
    /// Create a discovery rooted at `root` (usually `/usr`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GlobLibraryDiscovery { root: root.into() }
    }
}

impl LibraryDiscovery for GlobLibraryDiscovery {
    fn discover(&self, pattern: &str) -> BTreeSet<String> {
        let full_pattern = self.root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = match glob::glob(&pattern_str) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("invalid library pattern `{}`: {}", pattern_str, e);
                return BTreeSet::new();
            }
        };

        let names: BTreeSet<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|path| linkable_name(&path))
            .collect();

        tracing::debug!("`{}` matched {} libraries", pattern_str, names.len());
        names
    }
}
