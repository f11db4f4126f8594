//! Macro, include path, compiler flag and linker flag assembly.
//!
//! Everything here is keyed on the platform family and the resolved
//! toggles. The two side-effecting inputs, system library discovery and the
//! atomics link probe, come in through [`LibraryDiscovery`] and
//! [`CompileProbe`] so the assembler itself stays deterministic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::builder::discovery::LibraryDiscovery;
use crate::builder::errors::PlanError;
use crate::builder::probe::{needs_libatomic, CompileProbe};
use crate::core::extension::{push_unique, MacroSet};
use crate::core::platform::{OsFamily, PlatformFacts, MIN_DEPLOYMENT_TARGET};
use crate::core::toggles::{split_command, vars, BuildConfiguration};

/// User agent name reported by the extension.
pub const USER_AGENT_NAME: &str = "Python";

/// Flags, paths and libraries shared by every module of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledFlags {
    pub macros: MacroSet,
    /// Dependency include directories, in priority order
    pub include_dirs: Vec<PathBuf>,
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub libraries: Vec<String>,
    /// Environment the compiler invocation must export
    pub environment: Vec<(String, String)>,
}

/// Quote a string macro value for the target compiler.
///
/// MSVC strips one level of quoting when it reads `/D` values, so Windows
/// gets an escaped quoted string; every other compiler gets a plain one.
pub fn quote_define(platform: &PlatformFacts, value: &str) -> String {
    match platform.os {
        OsFamily::Windows => format!(r#""\"{}\"""#, value),
        _ => format!(r#""{}""#, value),
    }
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

/// Dependency include directories in fixed priority order.
///
/// A system library swaps its own slot for a system header location; the
/// other slots keep their position. Duplicates keep their first position.
pub fn dependency_include_dirs(platform: &PlatformFacts, config: &BuildConfiguration) -> Vec<PathBuf> {
    let core = paths(&["."]);

    let grpc = if config.use_system_rpc_core() {
        paths(&["/usr/include/grpc"])
    } else {
        paths(&["include"])
    };

    let absl = if config.use_system_base_library() {
        paths(&["/usr/include"])
    } else {
        paths(&["third_party/abseil-cpp"])
    };

    let address_sorting = paths(&["third_party/address_sorting/include"]);

    let cares = if config.use_system_dns() {
        paths(&["/usr/include"])
    } else {
        let mut dirs = paths(&[
            "third_party/cares/cares/include",
            "third_party/cares",
            "third_party/cares/cares",
        ]);
        let config_dir = match (platform.os, platform.os_name.as_str()) {
            (OsFamily::Darwin, _) => Some("third_party/cares/config_darwin"),
            (OsFamily::Linux, _) => Some("third_party/cares/config_linux"),
            (_, "freebsd") => Some("third_party/cares/config_freebsd"),
            (_, "openbsd") => Some("third_party/cares/config_openbsd"),
            _ => None,
        };
        dirs.extend(config_dir.map(PathBuf::from));
        dirs
    };

    let re2 = if config.use_system_regex() {
        paths(&["/usr/include/re2"])
    } else {
        paths(&["third_party/re2"])
    };

    let ssl = if config.use_system_tls() {
        paths(&["/usr/include/openssl"])
    } else {
        paths(&["third_party/boringssl-with-bazel/src/include"])
    };

    // System gRPC brings its own upb and hashing; the bundled headers go.
    let (upb, upb_gen, upbdefs_gen, utf8_range, xxhash) = if config.use_system_rpc_core() {
        (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new())
    } else {
        (
            paths(&["third_party/upb"]),
            paths(&["src/core/ext/upb-gen"]),
            paths(&["src/core/ext/upbdefs-gen"]),
            paths(&["third_party/utf8_range"]),
            paths(&["third_party/xxhash"]),
        )
    };

    let zlib = if config.use_system_compression() {
        paths(&["/usr/include"])
    } else {
        paths(&["third_party/zlib"])
    };

    let mut dirs = Vec::new();
    for slot in [
        core,
        grpc,
        absl,
        address_sorting,
        cares,
        re2,
        ssl,
        upb,
        upb_gen,
        upbdefs_gen,
        utf8_range,
        xxhash,
        zlib,
    ] {
        for dir in slot {
            push_unique(&mut dirs, dir);
        }
    }
    dirs
}

/// Assembles flags for one resolution.
pub struct FlagAssembler<'a> {
    platform: &'a PlatformFacts,
    config: &'a BuildConfiguration,
    discovery: &'a dyn LibraryDiscovery,
    probe: &'a dyn CompileProbe,
    version: String,
}

impl<'a> FlagAssembler<'a> {
    pub fn new(
        platform: &'a PlatformFacts,
        config: &'a BuildConfiguration,
        discovery: &'a dyn LibraryDiscovery,
        probe: &'a dyn CompileProbe,
    ) -> Self {
        FlagAssembler {
            platform,
            config,
            discovery,
            probe,
            version: "0.0.0".to_string(),
        }
    }

    /// Set the package version reported in the user agent.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Assemble everything.
    pub fn assemble(&self) -> Result<AssembledFlags, PlanError> {
        Ok(AssembledFlags {
            macros: self.macros()?,
            include_dirs: dependency_include_dirs(self.platform, self.config),
            compile_flags: self.compile_flags(),
            link_flags: self.link_flags(),
            libraries: self.libraries(),
            environment: self.environment(),
        })
    }

    /// Preprocessor definitions, in definition order.
    pub fn macros(&self) -> Result<MacroSet, PlanError> {
        let mut macros = MacroSet::new();

        macros.define("_WIN32_WINNT", Some("0x600"))?;
        macros.define(
            "GRPC_XDS_USER_AGENT_NAME_SUFFIX",
            Some(quote_define(self.platform, USER_AGENT_NAME)),
        )?;
        macros.define(
            "GRPC_XDS_USER_AGENT_VERSION_SUFFIX",
            Some(quote_define(self.platform, &self.version)),
        )?;

        if self.platform.os == OsFamily::Windows {
            // c-ares is excluded on Windows, see the source filter
            macros.define("WIN32_LEAN_AND_MEAN", Some("1"))?;
            macros.define("CARES_STATICLIB", Some("1"))?;
            macros.define("GRPC_ARES", Some("0"))?;
            macros.define("NTDDI_VERSION", Some("0x06000000"))?;
            macros.define("NOMINMAX", Some("1"))?;
            if self.platform.is_64bit() {
                macros.define("MS_WIN64", Some("1"))?;
            }
        } else {
            macros.define("HAVE_CONFIG_H", Some("1"))?;
            macros.define("GRPC_ENABLE_FORK_SUPPORT", Some("1"))?;
        }

        macros.define("GRPC_DO_NOT_INSTANTIATE_POSIX_POLLER", Some("1"))?;
        // Must be defined before <inttypes.h> is first included.
        macros.define("__STDC_FORMAT_MACROS", None::<&str>)?;

        if self.platform.os.is_linux_or_darwin() {
            macros.define(
                "PyMODINIT_FUNC",
                Some(r#"extern "C" __attribute__((visibility ("default"))) PyObject*"#),
            )?;
            macros.define("GRPC_POSIX_FORK_ALLOW_PTHREAD_ATFORK", Some("1"))?;
        }

        if self.config.enable_tracing() {
            macros.define("CYTHON_TRACE_NOGIL", Some("1"))?;
        }

        Ok(macros)
    }

    /// Compiler flags: the override when given, else platform defaults.
    pub fn compile_flags(&self) -> Vec<String> {
        if let Some(flags) = self.config.compile_flags_override() {
            tracing::debug!("using {} for compiler flags", vars::CFLAGS);
            return split_command(flags);
        }

        let defaults: &[&str] = match self.platform.os {
            // MSVC defaults to C++14, so only C11 is requested. Only the
            // static C++ runtime is available.
            OsFamily::Windows => &["/std:c11", "/MT"],
            OsFamily::Linux => &[
                "-std=c++14",
                "-fvisibility=hidden",
                "-fno-wrapv",
                "-fno-exceptions",
            ],
            OsFamily::Darwin => &[
                "-std=c++14",
                "-stdlib=libc++",
                "-fvisibility=hidden",
                "-fno-wrapv",
                "-fno-exceptions",
                "-DHAVE_UNISTD_H",
            ],
            OsFamily::OtherUnix => &[],
        };
        defaults.iter().map(|f| f.to_string()).collect()
    }

    /// Linker flags: the override when given, else platform defaults, plus
    /// the flags that always apply.
    pub fn link_flags(&self) -> Vec<String> {
        let mut flags = match self.config.link_flags_override() {
            Some(override_flags) => {
                tracing::debug!("using {} for linker flags", vars::LDFLAGS);
                split_command(override_flags)
            }
            None => self.default_link_flags(),
        };

        if self.platform.os == OsFamily::Darwin {
            // Package managers like Conda otherwise leave CoreFoundation
            // symbols unresolved.
            flags.push("-framework".to_string());
            flags.push("CoreFoundation".to_string());
        }

        if self.config.statically_link_runtime() {
            flags.push("-static-libstdc++".to_string());
        }

        flags
    }

    fn default_link_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        if self.platform.os.is_linux_or_darwin() {
            flags.push("-lpthread".to_string());
            if needs_libatomic(self.probe) {
                tracing::info!("linker needs libatomic, adding -latomic");
                flags.push("-latomic".to_string());
            }
        }

        if self.platform.os == OsFamily::Linux {
            flags.push("-static-libgcc".to_string());
        }

        flags
    }

    /// Libraries to link.
    pub fn libraries(&self) -> Vec<String> {
        let mut libs: Vec<String> = Vec::new();
        let mut add = |names: &[&str]| {
            for name in names {
                push_unique(&mut libs, name.to_string());
            }
        };

        if self.platform.os == OsFamily::Linux {
            add(&["rt"]);
        }
        if self.platform.os == OsFamily::Windows {
            add(&["advapi32", "bcrypt", "dbghelp", "ws2_32"]);
        } else {
            add(&["m"]);
        }
        if self.config.use_system_tls() {
            add(&["ssl", "crypto"]);
        }
        if self.config.use_system_compression() {
            add(&["z"]);
        }
        if self.config.use_system_dns() {
            add(&["cares"]);
        }
        if self.config.use_system_regex() {
            add(&["re2"]);
        }

        if self.config.use_system_base_library() {
            let pattern = format!("lib*/libabsl_*{}", self.platform.shared_lib_suffix());
            let found = self.discovery.discover(&pattern);
            if found.is_empty() {
                tracing::warn!("no system abseil libraries matched `{}`", pattern);
            }
            for name in found {
                push_unique(&mut libs, name);
            }
        }

        if self.config.use_system_rpc_core() {
            push_unique(&mut libs, "grpc".to_string());
            push_unique(&mut libs, "gpr".to_string());
        }

        libs
    }

    /// Environment exported to the compiler invocation.
    pub fn environment(&self) -> Vec<(String, String)> {
        if self.platform.os != OsFamily::Darwin || self.config.deployment_target().is_some() {
            return Vec::new();
        }

        if self.platform.deployment_target_too_old() {
            vec![(
                vars::DEPLOYMENT_TARGET.to_string(),
                MIN_DEPLOYMENT_TARGET.to_string(),
            )]
        } else {
            Vec::new()
        }
    }
}
