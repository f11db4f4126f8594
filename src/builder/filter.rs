//! Source set filtering.
//!
//! Each system-provided dependency removes its group from the catalog.
//! Windows additionally never compiles the bundled c-ares sources; that
//! exclusion applies regardless of toggles.

use std::path::PathBuf;

use crate::core::catalog::{DependencyGroup, SourceCatalog};
use crate::core::platform::{OsFamily, PlatformFacts};
use crate::core::toggles::BuildConfiguration;

/// Groups excluded from compilation, in evaluation order.
pub fn excluded_groups(config: &BuildConfiguration, platform: &PlatformFacts) -> Vec<DependencyGroup> {
    let mut groups = config.system_groups();

    // c-ares does not build on Windows yet
    if platform.os == OsFamily::Windows && !groups.contains(&DependencyGroup::Dns) {
        groups.push(DependencyGroup::Dns);
    }

    groups
}

/// Resolve the catalog into the ordered list of sources to compile.
///
/// Retained entries keep their catalog order.
pub fn filter_sources(
    catalog: &SourceCatalog,
    config: &BuildConfiguration,
    platform: &PlatformFacts,
) -> Vec<PathBuf> {
    let excluded = excluded_groups(config, platform);

    let sources: Vec<PathBuf> = catalog
        .entries()
        .iter()
        .filter(|entry| !excluded.contains(&entry.group))
        .map(|entry| entry.path.clone())
        .collect();

    tracing::debug!(
        "filtered catalog: kept {} of {} sources (excluded groups: {:?})",
        sources.len(),
        catalog.len(),
        excluded
    );

    sources
}
