//! Plan resolution.
//!
//! Gathers every input a plan depends on (layered configuration, platform
//! facts, the catalog manifest, toolchain probes, library discovery and
//! codegen freshness) and hands them to the pure plan builder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::codegen::{CodegenDecision, FsCodegenOracle};
use crate::builder::discovery::GlobLibraryDiscovery;
use crate::builder::errors::PlanError;
use crate::builder::flags::{AssembledFlags, FlagAssembler};
use crate::builder::plan::{prebuilt_objects, BuildPlan};
use crate::builder::probe::{AssumeLinks, CompileProbe, MemoizedProbe, ToolchainProbe};
use crate::core::catalog::Catalog;
use crate::core::platform::PlatformFacts;
use crate::core::toggles::{BuildConfiguration, RawEnv};
use crate::util::config::{global_config_path, layer_env, load_config, process_env, project_config_path};

/// Options for plan resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Path to the catalog manifest
    pub manifest_path: PathBuf,
    /// `KEY=VALUE` overrides from the command line
    pub env_overrides: Vec<(String, String)>,
    /// Resolve for this OS instead of the host
    pub os: Option<String>,
    /// Resolve for this architecture instead of the host
    pub arch: Option<String>,
    /// Run the toolchain link probe
    pub probe: bool,
    /// Read recognised variables from the process environment
    pub use_process_env: bool,
    /// Read the global config file
    pub use_global_config: bool,
    /// Root for system library discovery
    pub system_root: PathBuf,
}

impl ResolveOptions {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        ResolveOptions {
            manifest_path: manifest_path.into(),
            env_overrides: Vec::new(),
            os: None,
            arch: None,
            probe: true,
            use_process_env: true,
            use_global_config: true,
            system_root: PathBuf::from("/usr"),
        }
    }

    /// Directory holding the manifest; relative catalog paths resolve here.
    pub fn project_root(&self) -> PathBuf {
        match self.manifest_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Everything resolved for one invocation.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: PathBuf,
    pub raw_env: RawEnv,
    pub config: BuildConfiguration,
    pub platform: PlatformFacts,
    pub catalog: Catalog,
    pub flags: AssembledFlags,
    pub codegen: CodegenDecision,
}

impl Resolution {
    /// Build the plan.
    pub fn plan(&self) -> Result<BuildPlan> {
        let plan = BuildPlan::new(
            &self.catalog,
            &self.config,
            &self.platform,
            &self.flags,
            self.codegen,
        )?;
        Ok(plan)
    }
}

/// Merge config files, process environment and command-line overrides.
pub fn resolve_environment(opts: &ResolveOptions) -> RawEnv {
    let global = if opts.use_global_config {
        global_config_path()
    } else {
        None
    };
    let files = load_config(global.as_deref(), &project_config_path(&opts.project_root()));

    let process = if opts.use_process_env {
        process_env(|name| std::env::var(name).ok())
    } else {
        RawEnv::new()
    };

    let cli: RawEnv = opts.env_overrides.iter().cloned().collect();

    layer_env([files.raw_env(), process, cli])
}

/// Platform facts for the host, with `--os`/`--arch` applied.
pub fn resolve_platform(opts: &ResolveOptions) -> PlatformFacts {
    let host = PlatformFacts::host();
    if opts.os.is_none() && opts.arch.is_none() {
        return host;
    }

    let os = opts.os.as_deref().unwrap_or(&host.os_name);
    let arch = opts.arch.as_deref().unwrap_or(&host.arch);
    tracing::debug!("resolving for {}-{} instead of the host", os, arch);
    PlatformFacts::new(os, arch)
}

/// Check that prebuilt core archives exist under the project root.
pub fn check_prebuilt_objects(root: &Path, config: &BuildConfiguration) -> Result<(), PlanError> {
    if !config.use_prebuilt_core() {
        return Ok(());
    }

    for object in prebuilt_objects(config) {
        if !root.join(&object).is_file() {
            return Err(PlanError::MissingPrebuiltObject { path: object });
        }
    }
    Ok(())
}

/// Resolve every plan input.
pub fn resolve(opts: &ResolveOptions) -> Result<Resolution> {
    let root = opts.project_root();
    let raw_env = resolve_environment(opts);
    let config = BuildConfiguration::resolve(&raw_env);
    let platform = resolve_platform(opts);
    tracing::debug!("target platform: {}", platform);

    let catalog = Catalog::load(&opts.manifest_path)?;
    check_prebuilt_objects(&root, &config)?;

    let discovery = GlobLibraryDiscovery::new(&opts.system_root);
    let toolchain_probe = MemoizedProbe::new(ToolchainProbe::new(config.probe_compiler().to_vec()));
    let probe: &dyn CompileProbe = if opts.probe {
        &toolchain_probe
    } else {
        &AssumeLinks
    };

    let flags = FlagAssembler::new(&platform, &config, &discovery, probe)
        .with_version(&catalog.package.version)
        .assemble()
        .context("failed to assemble compiler flags")?;

    let codegen = CodegenDecision::decide(&config, &catalog.modules, &FsCodegenOracle::new(&root));

    Ok(Resolution {
        root,
        raw_env,
        config,
        platform,
        catalog,
        flags,
        codegen,
    })
}

/// Resolve inputs and build the plan.
pub fn resolve_plan(opts: &ResolveOptions) -> Result<BuildPlan> {
    let plan = resolve(opts)?.plan()?;
    tracing::info!(
        "planned {} module(s), {} sources, fingerprint {}",
        plan.modules.len(),
        plan.source_count(),
        crate::util::hash::short(&plan.fingerprint)
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::asm::AsmOutcome;
    use crate::core::toggles::vars;
    use crate::test_support::write_sample_project;
    use tempfile::TempDir;

    fn options(root: &Path) -> ResolveOptions {
        let mut opts = ResolveOptions::new(write_sample_project(root));
        opts.os = Some("linux".to_string());
        opts.arch = Some("x86_64".to_string());
        opts.probe = false;
        opts.use_process_env = false;
        opts.use_global_config = false;
        opts.system_root = root.join("usr");
        opts
    }

    #[test]
    fn test_resolve_default_plan() {
        let tmp = TempDir::new().unwrap();
        let plan = resolve_plan(&options(tmp.path())).unwrap();

        assert_eq!(plan.platform, "linux-x86_64");
        assert_eq!(plan.assembly.outcome, AsmOutcome::Enabled);
        // No generated sources exist yet
        assert!(plan.codegen.regenerate);
        assert_eq!(
            plan.modules[0].sources[0],
            PathBuf::from("src/python/grpcio/grpc/_cython/cygrpc.pyx")
        );
    }

    #[test]
    fn test_cli_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        let config = project_config_path(tmp.path());
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(&config, "[env]\nGRPC_PYTHON_BUILD_SYSTEM_ZLIB = true\nCONFIG = \"dbg\"\n").unwrap();

        let mut opts = options(tmp.path());
        opts.env_overrides = vec![(vars::SYSTEM_ZLIB.to_string(), "False".to_string())];

        let resolution = resolve(&opts).unwrap();
        assert!(!resolution.config.use_system_compression());
        assert_eq!(resolution.config.prebuilt_config(), "dbg");
    }

    #[test]
    fn test_missing_prebuilt_object() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(tmp.path());
        opts.env_overrides = vec![(vars::PREBUILT_CORE.to_string(), "1".to_string())];

        let err = resolve_plan(&opts).unwrap_err();
        let plan_err = err.downcast_ref::<PlanError>().unwrap();
        assert!(matches!(plan_err, PlanError::MissingPrebuiltObject { path } if path.ends_with("libares.a")));
    }

    #[test]
    fn test_prebuilt_objects_present() {
        let tmp = TempDir::new().unwrap();
        let libs = tmp.path().join("libs/opt");
        std::fs::create_dir_all(&libs).unwrap();
        for archive in crate::builder::plan::PREBUILT_ARCHIVES {
            std::fs::write(libs.join(archive), "!<arch>\n").unwrap();
        }

        let mut opts = options(tmp.path());
        opts.env_overrides = vec![(vars::PREBUILT_CORE.to_string(), "True".to_string())];
        let plan = resolve_plan(&opts).unwrap();
        assert_eq!(plan.modules[0].extra_objects.len(), 4);
    }

    #[test]
    fn test_system_absl_discovery() {
        let tmp = TempDir::new().unwrap();
        let lib = tmp.path().join("usr/lib64");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("libabsl_base.so"), "").unwrap();
        std::fs::write(lib.join("libabsl_strings.so"), "").unwrap();

        let mut opts = options(tmp.path());
        opts.env_overrides = vec![(vars::SYSTEM_ABSL.to_string(), "1".to_string())];
        let resolution = resolve(&opts).unwrap();
        assert!(resolution.flags.libraries.contains(&"absl_base".to_string()));
        assert!(resolution.flags.libraries.contains(&"absl_strings".to_string()));
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(tmp.path());
        opts.manifest_path = tmp.path().join("nope.toml");
        let err = resolve(&opts).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read catalog manifest"));
    }
}
