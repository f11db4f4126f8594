//! Extension plan generation.
//!
//! A [`BuildPlan`] is the complete, serializable description of every native
//! module: what to compile, with which definitions, search paths and flags,
//! and what to link. Building it is pure; all probing and filesystem lookups
//! happen before, in [`crate::ops::resolve_plan`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::builder::asm::{select_assembly, AsmSelection};
use crate::builder::codegen::CodegenDecision;
use crate::builder::errors::PlanError;
use crate::builder::filter::filter_sources;
use crate::builder::flags::AssembledFlags;
use crate::core::catalog::{Catalog, DependencyGroup, ModuleDecl, PackageInfo};
use crate::core::extension::{push_unique, ExtensionSpec};
use crate::core::platform::{OsFamily, PlatformFacts};
use crate::core::toggles::BuildConfiguration;
use crate::util::hash::Fingerprint;

/// Prebuilt core archives, relative to `libs/<CONFIG>/`.
pub const PREBUILT_ARCHIVES: [&str; 4] = ["libares.a", "libboringssl.a", "libgpr.a", "libgrpc.a"];

/// Prebuilt core archive paths for a build configuration name.
pub fn prebuilt_objects(config: &BuildConfiguration) -> Vec<PathBuf> {
    PREBUILT_ARCHIVES
        .iter()
        .map(|archive| {
            PathBuf::from("libs")
                .join(config.prebuilt_config())
                .join(archive)
        })
        .collect()
}

/// A complete extension build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub package: PackageInfo,
    /// Target platform string
    pub platform: String,
    pub os: OsFamily,
    pub configuration: BuildConfiguration,
    pub assembly: AsmSelection,
    pub codegen: CodegenDecision,
    /// Environment the compiler invocation must export
    pub environment: BTreeMap<String, String>,
    pub modules: Vec<ExtensionSpec>,
    /// SHA-256 over the module descriptions
    pub fingerprint: String,
}

impl BuildPlan {
    /// Compose a plan from resolved inputs.
    pub fn new(
        catalog: &Catalog,
        config: &BuildConfiguration,
        platform: &PlatformFacts,
        flags: &AssembledFlags,
        codegen: CodegenDecision,
    ) -> Result<Self, PlanError> {
        let assembly = select_assembly(platform, config, config.assembly_platform_override());
        let modules = build_extensions(catalog, config, platform, flags, &assembly, codegen)?;
        let fingerprint = fingerprint_modules(&modules);

        Ok(BuildPlan {
            package: catalog.package.clone(),
            platform: platform.platform_string(),
            os: platform.os,
            configuration: config.clone(),
            assembly,
            codegen,
            environment: flags.environment.iter().cloned().collect(),
            modules,
            fingerprint,
        })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total number of sources across modules.
    pub fn source_count(&self) -> usize {
        self.modules.iter().map(|m| m.sources.len()).sum()
    }
}

/// Build one [`ExtensionSpec`] per declared module.
pub fn build_extensions(
    catalog: &Catalog,
    config: &BuildConfiguration,
    platform: &PlatformFacts,
    flags: &AssembledFlags,
    assembly: &AsmSelection,
    codegen: CodegenDecision,
) -> Result<Vec<ExtensionSpec>, PlanError> {
    // Prebuilt archives replace every catalog source.
    let core_sources = if config.use_prebuilt_core() {
        Vec::new()
    } else {
        filter_sources(&catalog.sources, config, platform)
    };
    let asm_sources = assembly
        .source_group
        .as_deref()
        .map(|group| catalog.asm_group(group))
        .unwrap_or(&[]);

    let mut macros = flags.macros.clone();
    if let Some((ref name, ref value)) = assembly.disable_macro {
        macros.define(name.as_str(), Some(value.as_str()))?;
    }

    let mut compile_args = flags.compile_flags.clone();
    compile_args.extend(assembly.extra_compile_flags.iter().cloned());

    let extra_objects = if config.use_prebuilt_core() {
        prebuilt_objects(config)
    } else {
        Vec::new()
    };

    catalog
        .modules
        .iter()
        .map(|module| -> Result<ExtensionSpec, PlanError> {
            let spec = ExtensionSpec {
                name: module.name.clone(),
                sources: module_sources(module, codegen, &core_sources, asm_sources)?,
                include_dirs: include_dirs(module, flags),
                define_macros: macros.clone(),
                libraries: flags.libraries.clone(),
                extra_objects: extra_objects.clone(),
                extra_compile_args: compile_args.clone(),
                extra_link_args: flags.link_flags.clone(),
            };
            check_prebuilt_exclusivity(&spec, catalog, config)?;
            tracing::debug!(
                "planned module {}: {} sources, {} macros",
                spec.name,
                spec.sources.len(),
                spec.define_macros.len()
            );
            Ok(spec)
        })
        .collect()
}

fn module_sources(
    module: &ModuleDecl,
    codegen: CodegenDecision,
    core_sources: &[PathBuf],
    asm_sources: &[PathBuf],
) -> Result<Vec<PathBuf>, PlanError> {
    let entry = if codegen.regenerate {
        module.source.clone()
    } else {
        module.generated_source()
    };

    let candidates = std::iter::once(entry)
        .chain(module.helpers.iter().cloned())
        .chain(core_sources.iter().cloned())
        .chain(asm_sources.iter().cloned());

    let mut sources = Vec::new();
    for path in candidates {
        if sources.contains(&path) {
            return Err(PlanError::DuplicateSource {
                module: module.name.clone(),
                path,
            });
        }
        sources.push(path);
    }
    Ok(sources)
}

fn include_dirs(module: &ModuleDecl, flags: &AssembledFlags) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for dir in module.include_dirs.iter().chain(&flags.include_dirs) {
        push_unique(&mut dirs, dir.clone());
    }
    dirs
}

/// Prebuilt core replaces the core sources with archives, never both.
fn check_prebuilt_exclusivity(
    spec: &ExtensionSpec,
    catalog: &Catalog,
    config: &BuildConfiguration,
) -> Result<(), PlanError> {
    if !config.use_prebuilt_core() {
        debug_assert!(spec.extra_objects.is_empty());
        return Ok(());
    }

    if spec.extra_objects.is_empty() {
        return Err(PlanError::NoPrebuiltObjects {
            module: spec.name.clone(),
        });
    }

    let leaked = catalog
        .sources
        .entries()
        .iter()
        .find(|entry| entry.group == DependencyGroup::RpcCore && spec.sources.contains(&entry.path));
    if let Some(entry) = leaked {
        return Err(PlanError::PrebuiltSourceConflict {
            module: spec.name.clone(),
            path: entry.path.clone(),
        });
    }

    Ok(())
}

fn fingerprint_modules(modules: &[ExtensionSpec]) -> String {
    let mut fp = Fingerprint::new();
    for module in modules {
        fp.update_str(&module.name);
        fp.update_paths(&module.sources);
        fp.update_paths(&module.include_dirs);
        fp.update_strs(module.define_macros.iter().map(|d| d.to_flag()));
        fp.update_strs(module.libraries.iter().cloned());
        fp.update_paths(&module.extra_objects);
        fp.update_strs(module.extra_compile_args.iter().cloned());
        fp.update_strs(module.extra_link_args.iter().cloned());
    }
    fp.finish()
}
