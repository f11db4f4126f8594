//! Build toggles and their resolution into a `BuildConfiguration`.
//!
//! Toggles arrive as a flat string map (normally the process environment,
//! layered with config files and CLI overrides). Boolean parsing is
//! deliberately permissive: only the tokens in [`FALSY_TOKENS`] read as
//! false, so `"no"` or `"off"` enable a toggle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::catalog::DependencyGroup;

/// Raw key/value input to toggle resolution.
pub type RawEnv = BTreeMap<String, String>;

/// Upper-cased values that parse as `false`. Everything else is `true`.
pub const FALSY_TOKENS: [&str; 3] = ["FALSE", "0", ""];

/// Environment variable names understood by the resolver.
pub mod vars {
    pub const BORING_SSL_ASM: &str = "GRPC_BUILD_WITH_BORING_SSL_ASM";
    pub const ASM_PLATFORM_OVERRIDE: &str = "GRPC_BUILD_OVERRIDE_BORING_SSL_ASM_PLATFORM";
    pub const WITH_CYTHON: &str = "GRPC_PYTHON_BUILD_WITH_CYTHON";
    pub const SYSTEM_OPENSSL: &str = "GRPC_PYTHON_BUILD_SYSTEM_OPENSSL";
    pub const SYSTEM_ZLIB: &str = "GRPC_PYTHON_BUILD_SYSTEM_ZLIB";
    pub const SYSTEM_CARES: &str = "GRPC_PYTHON_BUILD_SYSTEM_CARES";
    pub const SYSTEM_RE2: &str = "GRPC_PYTHON_BUILD_SYSTEM_RE2";
    pub const SYSTEM_ABSL: &str = "GRPC_PYTHON_BUILD_SYSTEM_ABSL";
    pub const SYSTEM_GRPC: &str = "GRPC_PYTHON_BUILD_SYSTEM_GRPC";
    pub const STATIC_LIBSTDCXX: &str = "GRPC_PYTHON_BUILD_WITH_STATIC_LIBSTDCXX";
    pub const PREBUILT_CORE: &str = "GRPC_PYTHON_USE_PREBUILT_GRPC_CORE";
    pub const CYTHON_TRACING: &str = "GRPC_PYTHON_ENABLE_CYTHON_TRACING";
    pub const CFLAGS: &str = "GRPC_PYTHON_CFLAGS";
    pub const LDFLAGS: &str = "GRPC_PYTHON_LDFLAGS";
    pub const CXX: &str = "CXX";
    pub const CONFIG: &str = "CONFIG";
    pub const DEPLOYMENT_TARGET: &str = "MACOSX_DEPLOYMENT_TARGET";
}

/// A documented input knob.
#[derive(Debug, Clone, Copy)]
pub struct Knob {
    /// Environment variable name
    pub var: &'static str,
    /// Default when unset (`None` means "unset")
    pub default: Option<&'static str>,
    /// One-line description
    pub description: &'static str,
}

/// Every knob the resolver reads, in display order.
pub const KNOBS: &[Knob] = &[
    Knob {
        var: vars::BORING_SSL_ASM,
        default: Some("True"),
        description: "build BoringSSL with assembly optimizations",
    },
    Knob {
        var: vars::ASM_PLATFORM_OVERRIDE,
        default: Some(""),
        description: "platform string used to pick assembly (cross builds)",
    },
    Knob {
        var: vars::WITH_CYTHON,
        default: Some("False"),
        description: "always regenerate extension sources",
    },
    Knob {
        var: vars::SYSTEM_OPENSSL,
        default: Some("False"),
        description: "link the system OpenSSL instead of bundled BoringSSL",
    },
    Knob {
        var: vars::SYSTEM_ZLIB,
        default: Some("False"),
        description: "link the system zlib",
    },
    Knob {
        var: vars::SYSTEM_CARES,
        default: Some("False"),
        description: "link the system c-ares",
    },
    Knob {
        var: vars::SYSTEM_RE2,
        default: Some("False"),
        description: "link the system re2",
    },
    Knob {
        var: vars::SYSTEM_ABSL,
        default: Some("False"),
        description: "link the system abseil",
    },
    Knob {
        var: vars::SYSTEM_GRPC,
        default: Some("False"),
        description: "link the system gRPC core (implies all system libraries)",
    },
    Knob {
        var: vars::STATIC_LIBSTDCXX,
        default: Some("False"),
        description: "statically link the C++ runtime",
    },
    Knob {
        var: vars::PREBUILT_CORE,
        default: Some("False"),
        description: "link prebuilt core archives instead of compiling core",
    },
    Knob {
        var: vars::CYTHON_TRACING,
        default: Some("False"),
        description: "enable line tracing in generated sources",
    },
    Knob {
        var: vars::CFLAGS,
        default: None,
        description: "replace the platform default compiler flags",
    },
    Knob {
        var: vars::LDFLAGS,
        default: None,
        description: "replace the platform default linker flags",
    },
    Knob {
        var: vars::CXX,
        default: Some("c++"),
        description: "compiler used for link probes",
    },
    Knob {
        var: vars::CONFIG,
        default: Some("opt"),
        description: "prebuilt core configuration directory under libs/",
    },
    Knob {
        var: vars::DEPLOYMENT_TARGET,
        default: None,
        description: "macOS deployment target",
    },
];

/// Parse a boolean toggle.
///
/// Missing keys take `default`. The value is upper-cased and compared
/// against [`FALSY_TOKENS`]; any other value is `true`.
pub fn parse_env_bool(raw: &RawEnv, name: &str, default: &str) -> bool {
    let value = raw.get(name).map(String::as_str).unwrap_or(default);
    !FALSY_TOKENS.contains(&value.to_uppercase().as_str())
}

/// Split a command line the way a POSIX shell would.
///
/// Strings shlex cannot parse (an unbalanced quote) fall back to plain
/// whitespace splitting with a warning.
pub fn split_command(line: &str) -> Vec<String> {
    match shlex::split(line) {
        Some(words) => words,
        None => {
            tracing::warn!("could not parse `{}` as shell words, splitting on whitespace", line);
            line.split_whitespace().map(str::to_string).collect()
        }
    }
}

/// Resolved, self-consistent build configuration.
///
/// Fields are private and every constructor, deserialization included, runs
/// the system core cascade, so no reader ever sees an inconsistent
/// combination of toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigurationFields")]
pub struct BuildConfiguration {
    use_system_tls: bool,
    use_system_compression: bool,
    use_system_dns: bool,
    use_system_regex: bool,
    use_system_base_library: bool,
    use_system_rpc_core: bool,
    use_prebuilt_core: bool,
    enable_assembly: bool,
    assembly_platform_override: Option<String>,
    statically_link_runtime: bool,
    enable_tracing: bool,
    force_codegen: bool,
    compile_flags_override: Option<String>,
    link_flags_override: Option<String>,
    probe_compiler: Vec<String>,
    prebuilt_config: String,
    deployment_target: Option<String>,
}

/// Serialized form of [`BuildConfiguration`], before the cascade.
#[derive(Deserialize)]
struct ConfigurationFields {
    use_system_tls: bool,
    use_system_compression: bool,
    use_system_dns: bool,
    use_system_regex: bool,
    use_system_base_library: bool,
    use_system_rpc_core: bool,
    use_prebuilt_core: bool,
    enable_assembly: bool,
    assembly_platform_override: Option<String>,
    statically_link_runtime: bool,
    enable_tracing: bool,
    force_codegen: bool,
    compile_flags_override: Option<String>,
    link_flags_override: Option<String>,
    probe_compiler: Vec<String>,
    prebuilt_config: String,
    deployment_target: Option<String>,
}

impl From<ConfigurationFields> for BuildConfiguration {
    fn from(fields: ConfigurationFields) -> Self {
        BuildConfiguration {
            use_system_tls: fields.use_system_tls,
            use_system_compression: fields.use_system_compression,
            use_system_dns: fields.use_system_dns,
            use_system_regex: fields.use_system_regex,
            use_system_base_library: fields.use_system_base_library,
            use_system_rpc_core: fields.use_system_rpc_core,
            use_prebuilt_core: fields.use_prebuilt_core,
            enable_assembly: fields.enable_assembly,
            assembly_platform_override: fields.assembly_platform_override.filter(|v| !v.is_empty()),
            statically_link_runtime: fields.statically_link_runtime,
            enable_tracing: fields.enable_tracing,
            force_codegen: fields.force_codegen,
            compile_flags_override: fields.compile_flags_override,
            link_flags_override: fields.link_flags_override,
            probe_compiler: if fields.probe_compiler.is_empty() {
                vec!["c++".to_string()]
            } else {
                fields.probe_compiler
            },
            prebuilt_config: fields.prebuilt_config,
            deployment_target: fields.deployment_target.filter(|v| !v.is_empty()),
        }
        .cascade()
    }
}

impl BuildConfiguration {
    /// Resolve raw toggles into a configuration.
    ///
    /// Unknown keys are ignored and no value is ever rejected.
    pub fn resolve(raw: &RawEnv) -> Self {
        let probe_compiler = split_command(raw.get(vars::CXX).map(String::as_str).unwrap_or("c++"));

        let config = BuildConfiguration {
            use_system_tls: parse_env_bool(raw, vars::SYSTEM_OPENSSL, "False"),
            use_system_compression: parse_env_bool(raw, vars::SYSTEM_ZLIB, "False"),
            use_system_dns: parse_env_bool(raw, vars::SYSTEM_CARES, "False"),
            use_system_regex: parse_env_bool(raw, vars::SYSTEM_RE2, "False"),
            use_system_base_library: parse_env_bool(raw, vars::SYSTEM_ABSL, "False"),
            use_system_rpc_core: parse_env_bool(raw, vars::SYSTEM_GRPC, "False"),
            use_prebuilt_core: parse_env_bool(raw, vars::PREBUILT_CORE, "False"),
            enable_assembly: parse_env_bool(raw, vars::BORING_SSL_ASM, "True"),
            assembly_platform_override: raw
                .get(vars::ASM_PLATFORM_OVERRIDE)
                .filter(|v| !v.is_empty())
                .cloned(),
            statically_link_runtime: parse_env_bool(raw, vars::STATIC_LIBSTDCXX, "False"),
            enable_tracing: parse_env_bool(raw, vars::CYTHON_TRACING, "False"),
            force_codegen: parse_env_bool(raw, vars::WITH_CYTHON, "False"),
            compile_flags_override: raw.get(vars::CFLAGS).cloned(),
            link_flags_override: raw.get(vars::LDFLAGS).cloned(),
            probe_compiler: if probe_compiler.is_empty() {
                vec!["c++".to_string()]
            } else {
                probe_compiler
            },
            prebuilt_config: raw
                .get(vars::CONFIG)
                .cloned()
                .unwrap_or_else(|| "opt".to_string()),
            deployment_target: raw
                .get(vars::DEPLOYMENT_TARGET)
                .filter(|v| !v.is_empty())
                .cloned(),
        };

        config.cascade()
    }

    /// Apply implication rules. System gRPC core implies every system
    /// dependency it is built against.
    fn cascade(self) -> Self {
        if !self.use_system_rpc_core {
            return self;
        }

        tracing::debug!("system gRPC core requested, forcing system dependencies");
        BuildConfiguration {
            use_system_tls: true,
            use_system_compression: true,
            use_system_dns: true,
            use_system_regex: true,
            use_system_base_library: true,
            ..self
        }
    }

    /// Whether a dependency group is provided by the system.
    pub fn uses_system(&self, group: DependencyGroup) -> bool {
        match group {
            DependencyGroup::Tls => self.use_system_tls,
            DependencyGroup::Compression => self.use_system_compression,
            DependencyGroup::Dns => self.use_system_dns,
            DependencyGroup::Regex => self.use_system_regex,
            DependencyGroup::BaseLibrary => self.use_system_base_library,
            DependencyGroup::RpcCore => self.use_system_rpc_core,
            DependencyGroup::None => false,
        }
    }

    pub fn use_system_tls(&self) -> bool {
        self.use_system_tls
    }

    pub fn use_system_compression(&self) -> bool {
        self.use_system_compression
    }

    pub fn use_system_dns(&self) -> bool {
        self.use_system_dns
    }

    pub fn use_system_regex(&self) -> bool {
        self.use_system_regex
    }

    pub fn use_system_base_library(&self) -> bool {
        self.use_system_base_library
    }

    pub fn use_system_rpc_core(&self) -> bool {
        self.use_system_rpc_core
    }

    pub fn use_prebuilt_core(&self) -> bool {
        self.use_prebuilt_core
    }

    pub fn enable_assembly(&self) -> bool {
        self.enable_assembly
    }

    /// Non-empty override for the assembly platform string.
    pub fn assembly_platform_override(&self) -> Option<&str> {
        self.assembly_platform_override.as_deref()
    }

    pub fn statically_link_runtime(&self) -> bool {
        self.statically_link_runtime
    }

    pub fn enable_tracing(&self) -> bool {
        self.enable_tracing
    }

    /// Regenerate extension sources even when cached output is fresh.
    pub fn force_codegen(&self) -> bool {
        self.force_codegen
    }

    /// Replacement for the default compiler flags. `Some("")` clears them.
    pub fn compile_flags_override(&self) -> Option<&str> {
        self.compile_flags_override.as_deref()
    }

    /// Replacement for the default linker flags. `Some("")` clears them.
    pub fn link_flags_override(&self) -> Option<&str> {
        self.link_flags_override.as_deref()
    }

    /// Compiler command used for link probes.
    pub fn probe_compiler(&self) -> &[String] {
        &self.probe_compiler
    }

    /// Build configuration name for prebuilt core archives.
    pub fn prebuilt_config(&self) -> &str {
        &self.prebuilt_config
    }

    /// Deployment target supplied by the environment.
    pub fn deployment_target(&self) -> Option<&str> {
        self.deployment_target.as_deref()
    }

    /// System-provided groups, in filter evaluation order.
    pub fn system_groups(&self) -> Vec<DependencyGroup> {
        DependencyGroup::OPTIONAL
            .iter()
            .copied()
            .filter(|group| self.uses_system(*group))
            .collect()
    }
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        BuildConfiguration::resolve(&RawEnv::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> RawEnv {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_falsy_tokens() {
        for value in ["false", "FALSE", "False", "0", ""] {
            let raw = env(&[(vars::SYSTEM_ZLIB, value)]);
            assert!(!parse_env_bool(&raw, vars::SYSTEM_ZLIB, "True"), "{value:?}");
        }
    }

    #[test]
    fn test_permissive_truthy_values() {
        for value in ["no", "off", "true", "1", "banana", " false"] {
            let raw = env(&[(vars::SYSTEM_ZLIB, value)]);
            assert!(parse_env_bool(&raw, vars::SYSTEM_ZLIB, "False"), "{value:?}");
        }
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfiguration::resolve(&RawEnv::new());
        assert!(config.enable_assembly);
        assert!(!config.use_system_tls);
        assert!(!config.use_system_rpc_core);
        assert!(!config.use_prebuilt_core);
        assert_eq!(config.assembly_platform_override, None);
        assert_eq!(config.compile_flags_override, None);
        assert_eq!(config.probe_compiler, vec!["c++".to_string()]);
        assert_eq!(config.prebuilt_config, "opt");
    }

    #[test]
    fn test_system_core_cascade_overrides_explicit_false() {
        let raw = env(&[
            (vars::SYSTEM_GRPC, "True"),
            (vars::SYSTEM_OPENSSL, "False"),
            (vars::SYSTEM_ZLIB, "0"),
            (vars::SYSTEM_CARES, ""),
            (vars::SYSTEM_RE2, "false"),
        ]);
        let config = BuildConfiguration::resolve(&raw);

        assert!(config.use_system_tls);
        assert!(config.use_system_compression);
        assert!(config.use_system_dns);
        assert!(config.use_system_regex);
        assert!(config.use_system_base_library);
        assert_eq!(config.system_groups(), DependencyGroup::OPTIONAL.to_vec());
    }

    #[test]
    fn test_cascade_is_one_directional() {
        let raw = env(&[
            (vars::SYSTEM_OPENSSL, "1"),
            (vars::SYSTEM_ZLIB, "1"),
            (vars::SYSTEM_CARES, "1"),
            (vars::SYSTEM_RE2, "1"),
            (vars::SYSTEM_ABSL, "1"),
        ]);
        let config = BuildConfiguration::resolve(&raw);
        assert!(!config.use_system_rpc_core);
    }

    #[test]
    fn test_empty_override_is_absent() {
        let raw = env(&[(vars::ASM_PLATFORM_OVERRIDE, "")]);
        assert_eq!(
            BuildConfiguration::resolve(&raw).assembly_platform_override,
            None
        );
    }

    #[test]
    fn test_empty_flag_override_is_kept() {
        let raw = env(&[(vars::CFLAGS, "")]);
        assert_eq!(
            BuildConfiguration::resolve(&raw).compile_flags_override,
            Some(String::new())
        );
    }

    #[test]
    fn test_probe_compiler_split() {
        let raw = env(&[(vars::CXX, "ccache  g++-13")]);
        assert_eq!(
            BuildConfiguration::resolve(&raw).probe_compiler(),
            vec!["ccache".to_string(), "g++-13".to_string()]
        );
    }

    #[test]
    fn test_probe_compiler_keeps_quoted_path() {
        let raw = env(&[(vars::CXX, "'/opt/my tools/g++' -m64")]);
        assert_eq!(
            BuildConfiguration::resolve(&raw).probe_compiler(),
            vec!["/opt/my tools/g++".to_string(), "-m64".to_string()]
        );
    }

    #[test]
    fn test_split_command_unbalanced_quote_falls_back() {
        assert_eq!(split_command("-DNAME=\"a b -O2"), vec!["-DNAME=\"a", "b", "-O2"]);
        assert_eq!(split_command("-DNAME=\"a b\" -O2"), vec!["-DNAME=a b", "-O2"]);
    }

    #[test]
    fn test_deserialize_applies_cascade() {
        let mut value = serde_json::to_value(BuildConfiguration::default()).unwrap();
        value["use_system_rpc_core"] = serde_json::Value::Bool(true);
        value["use_system_tls"] = serde_json::Value::Bool(false);
        value["use_system_compression"] = serde_json::Value::Bool(false);

        let config: BuildConfiguration = serde_json::from_value(value).unwrap();
        assert!(config.use_system_rpc_core());
        assert!(config.use_system_tls());
        assert!(config.use_system_compression());
        assert_eq!(config.system_groups(), DependencyGroup::OPTIONAL.to_vec());
    }

    #[test]
    fn test_serialized_round_trip_is_stable() {
        let raw = env(&[(vars::SYSTEM_ZLIB, "1"), (vars::CFLAGS, "")]);
        let config = BuildConfiguration::resolve(&raw);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BuildConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let raw = env(&[("SOMETHING_ELSE", "1")]);
        assert_eq!(BuildConfiguration::resolve(&raw), BuildConfiguration::default());
    }
}
