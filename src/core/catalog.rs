//! Source catalog and module declarations.
//!
//! The catalog is read from a TOML manifest (`extplan.toml` by default):
//!
//! ```toml
//! [package]
//! name = "grpcio"
//! version = "1.66.0"
//!
//! [[module]]
//! name = "grpc._cython.cygrpc"
//! source = "src/python/grpcio/grpc/_cython/cygrpc.pyx"
//! include_dirs = ["src/python/grpcio"]
//!
//! [sources]
//! files = [
//!     "src/core/lib/surface/call.cc",
//!     { path = "third_party/custom/tls_shim.c", group = "tls" },
//! ]
//!
//! [asm]
//! crypto_asm = ["third_party/boringssl-with-bazel/gen/crypto/aes-x86_64-apple.S"]
//! ```
//!
//! Every source entry carries a [`DependencyGroup`] tag from load time on.
//! Entries without an explicit `group` are tagged from their path.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default manifest file name.
pub const MANIFEST_NAME: &str = "extplan.toml";

/// Assembly group for gas-compatible assemblers. The crypto library's own
/// preprocessor conditionals pick the right variant per architecture.
pub const GAS_ASM_GROUP: &str = "crypto_asm";

/// Optional dependency a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyGroup {
    /// BoringSSL
    Tls,
    /// zlib
    Compression,
    /// c-ares
    Dns,
    /// re2
    Regex,
    /// abseil
    BaseLibrary,
    /// gRPC core and upb
    RpcCore,
    /// Always compiled
    None,
}

/// Path fragments that identify a group when no explicit tag is given.
/// Checked in order; the first hit wins.
const PATH_TAGS: &[(&str, DependencyGroup)] = &[
    ("third_party/boringssl", DependencyGroup::Tls),
    ("src/boringssl", DependencyGroup::Tls),
    ("third_party/zlib", DependencyGroup::Compression),
    ("third_party/cares", DependencyGroup::Dns),
    ("third_party/re2", DependencyGroup::Regex),
    ("third_party/abseil-cpp", DependencyGroup::BaseLibrary),
    ("src/core", DependencyGroup::RpcCore),
    ("third_party/upb", DependencyGroup::RpcCore),
];

impl DependencyGroup {
    /// Groups a toggle can remove, in filter evaluation order.
    pub const OPTIONAL: [DependencyGroup; 6] = [
        DependencyGroup::Tls,
        DependencyGroup::Compression,
        DependencyGroup::Dns,
        DependencyGroup::Regex,
        DependencyGroup::BaseLibrary,
        DependencyGroup::RpcCore,
    ];

    /// Infer the group of a catalog path.
    pub fn infer(path: &Path) -> DependencyGroup {
        let normalized = path.to_string_lossy().replace('\\', "/");
        PATH_TAGS
            .iter()
            .find(|(fragment, _)| normalized.contains(fragment))
            .map(|(_, group)| *group)
            .unwrap_or(DependencyGroup::None)
    }

    /// Get the group name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyGroup::Tls => "tls",
            DependencyGroup::Compression => "compression",
            DependencyGroup::Dns => "dns",
            DependencyGroup::Regex => "regex",
            DependencyGroup::BaseLibrary => "base-library",
            DependencyGroup::RpcCore => "rpc-core",
            DependencyGroup::None => "none",
        }
    }
}

impl fmt::Display for DependencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub group: DependencyGroup,
}

impl SourceEntry {
    /// Create an entry with an inferred group.
    pub fn inferred(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let group = DependencyGroup::infer(&path);
        SourceEntry { path, group }
    }

    /// Create an entry with an explicit group.
    pub fn tagged(path: impl Into<PathBuf>, group: DependencyGroup) -> Self {
        SourceEntry {
            path: path.into(),
            group,
        }
    }
}

/// Ordered master list of candidate sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceCatalog {
    entries: Vec<SourceEntry>,
}

impl SourceCatalog {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        SourceCatalog { entries }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries per group.
    pub fn group_counts(&self) -> BTreeMap<DependencyGroup, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.group).or_insert(0) += 1;
        }
        counts
    }
}

/// A native module to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// Dotted module name (e.g., `grpc._cython.cygrpc`)
    pub name: String,
    /// Extension template source (`.pyx`)
    pub source: PathBuf,
    /// Always-compiled helper sources
    #[serde(default)]
    pub helpers: Vec<PathBuf>,
    /// Module-local include directories, searched first
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
}

impl ModuleDecl {
    /// Path of the source generated from the template.
    pub fn generated_source(&self) -> PathBuf {
        self.source.with_extension("cpp")
    }
}

/// Package identity needed by the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

/// The complete module catalog: package, modules, sources, assembly groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub package: PackageInfo,
    pub modules: Vec<ModuleDecl>,
    pub sources: SourceCatalog,
    pub asm_groups: BTreeMap<String, Vec<PathBuf>>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    package: PackageInfo,
    #[serde(default, rename = "module")]
    modules: Vec<ModuleDecl>,
    #[serde(default)]
    sources: RawSources,
    #[serde(default)]
    asm: BTreeMap<String, Vec<PathBuf>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSources {
    #[serde(default)]
    files: Vec<RawSourceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSourceSpec {
    Path(PathBuf),
    Tagged {
        path: PathBuf,
        group: DependencyGroup,
    },
}

impl From<RawSourceSpec> for SourceEntry {
    fn from(spec: RawSourceSpec) -> Self {
        match spec {
            RawSourceSpec::Path(path) => SourceEntry::inferred(path),
            RawSourceSpec::Tagged { path, group } => SourceEntry::tagged(path, group),
        }
    }
}

impl Catalog {
    /// Load a catalog manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog manifest: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse catalog manifest: {}", path.display()))
    }

    /// Parse a catalog manifest.
    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawManifest = toml::from_str(contents)?;

        if raw.modules.is_empty() {
            bail!("manifest declares no [[module]] entries");
        }

        let mut seen = HashSet::new();
        for module in &raw.modules {
            if !seen.insert(module.name.as_str()) {
                bail!("module `{}` is declared more than once", module.name);
            }
        }

        let sources = SourceCatalog::new(raw.sources.files.into_iter().map(Into::into).collect());
        tracing::debug!(
            "loaded catalog for {} {}: {} modules, {} sources",
            raw.package.name,
            raw.package.version,
            raw.modules.len(),
            sources.len()
        );

        Ok(Catalog {
            package: raw.package,
            modules: raw.modules,
            sources,
            asm_groups: raw.asm,
        })
    }

    /// Sources of an assembly group; unknown groups are empty.
    pub fn asm_group(&self, key: &str) -> &[PathBuf] {
        self.asm_groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
