//! Host platform facts.
//!
//! Facts are computed once per invocation and are read by every later stage
//! of plan resolution. Nothing here mutates after construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Oldest macOS deployment target with a usable C++17 standard library.
pub const MIN_DEPLOYMENT_TARGET: &str = "10.14";

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
    /// Any other Unix-like system (FreeBSD, OpenBSD, ...)
    OtherUnix,
}

impl OsFamily {
    /// Classify an OS name as reported by `std::env::consts::OS` or a
    /// `--os` override.
    pub fn from_os_name(os: &str) -> Self {
        match os.to_ascii_lowercase().as_str() {
            "linux" => OsFamily::Linux,
            "macos" | "darwin" => OsFamily::Darwin,
            "windows" | "win32" => OsFamily::Windows,
            _ => OsFamily::OtherUnix,
        }
    }

    /// Get the family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Darwin => "darwin",
            OsFamily::Windows => "windows",
            OsFamily::OtherUnix => "other-unix",
        }
    }

    /// Linux and macOS share the pthread/atomic link rules.
    pub fn is_linux_or_darwin(&self) -> bool {
        matches!(self, OsFamily::Linux | OsFamily::Darwin)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable facts about the platform the extension is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFacts {
    /// OS family
    pub os: OsFamily,
    /// Raw OS name (freebsd, openbsd, linux, ...)
    pub os_name: String,
    /// CPU architecture (x86_64, aarch64, x86, ...)
    pub arch: String,
    /// Whether a gas-compatible assembler is available
    pub has_gas_assembler: bool,
    /// Default macOS deployment target of the host toolchain, if known
    pub deployment_target: Option<String>,
}

impl PlatformFacts {
    /// Create platform facts for an OS name and architecture.
    pub fn new(os_name: &str, arch: &str) -> Self {
        let os = OsFamily::from_os_name(os_name);
        PlatformFacts {
            os,
            os_name: os_name.to_ascii_lowercase(),
            arch: arch.to_string(),
            // MSVC ships no gas-compatible assembler
            has_gas_assembler: os != OsFamily::Windows,
            deployment_target: None,
        }
    }

    /// Detect the host platform.
    pub fn host() -> Self {
        PlatformFacts::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Set the default deployment target.
    pub fn with_deployment_target(mut self, target: impl Into<String>) -> Self {
        self.deployment_target = Some(target.into());
        self
    }

    /// Whether the default deployment target must be raised to
    /// [`MIN_DEPLOYMENT_TARGET`]. Unknown or unparsable targets count as too
    /// old.
    pub fn deployment_target_too_old(&self) -> bool {
        match self.deployment_target.as_deref().and_then(parse_version) {
            Some(version) => version < vec![10, 14],
            None => true,
        }
    }

    /// Deployment target the build ends up using when the environment does
    /// not set one.
    pub fn effective_deployment_target(&self) -> &str {
        match self.deployment_target.as_deref() {
            Some(target) if !self.deployment_target_too_old() => target,
            _ => MIN_DEPLOYMENT_TARGET,
        }
    }

    /// Whether the architecture has 64-bit pointers.
    pub fn is_64bit(&self) -> bool {
        matches!(
            self.arch.as_str(),
            "x86_64"
                | "amd64"
                | "aarch64"
                | "arm64"
                | "powerpc64"
                | "ppc64"
                | "ppc64le"
                | "s390x"
                | "riscv64"
                | "loongarch64"
                | "mips64"
                | "sparc64"
        )
    }

    /// Platform string in the `<os>-<arch>` form packaging tools report
    /// (`linux-x86_64`, `linux-i686`, `win-amd64`, `win32`,
    /// `macosx-11.0-arm64`). Darwin reports the effective deployment target.
    pub fn platform_string(&self) -> String {
        match self.os {
            OsFamily::Windows => match self.arch.as_str() {
                "x86_64" | "amd64" => "win-amd64".to_string(),
                "x86" | "i386" | "i686" => "win32".to_string(),
                "aarch64" | "arm64" => "win-arm64".to_string(),
                other => format!("win-{}", other),
            },
            OsFamily::Darwin => {
                let arch = match self.arch.as_str() {
                    "aarch64" => "arm64",
                    other => other,
                };
                format!("macosx-{}-{}", self.effective_deployment_target(), arch)
            }
            OsFamily::Linux | OsFamily::OtherUnix => {
                let arch = match self.arch.as_str() {
                    "x86" | "i386" => "i686",
                    other => other,
                };
                format!("{}-{}", self.os_name, arch)
            }
        }
    }

    /// Shared library suffix for this platform.
    pub fn shared_lib_suffix(&self) -> &'static str {
        match self.os {
            OsFamily::Windows => ".dll",
            OsFamily::Darwin => ".dylib",
            OsFamily::Linux | OsFamily::OtherUnix => ".so",
        }
    }
}

fn parse_version(version: &str) -> Option<Vec<u32>> {
    if version.is_empty() {
        return None;
    }
    version.split('.').map(|part| part.parse().ok()).collect()
}

impl fmt::Display for PlatformFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.platform_string(), self.os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_platform() {
        let host = PlatformFacts::host();
        assert!(!host.arch.is_empty());
        assert!(!host.os_name.is_empty());
    }

    #[test]
    fn test_os_family_classification() {
        assert_eq!(OsFamily::from_os_name("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_os_name("macos"), OsFamily::Darwin);
        assert_eq!(OsFamily::from_os_name("Windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_os_name("freebsd"), OsFamily::OtherUnix);
    }

    #[test]
    fn test_windows_has_no_gas() {
        assert!(!PlatformFacts::new("windows", "x86_64").has_gas_assembler);
        assert!(PlatformFacts::new("linux", "x86_64").has_gas_assembler);
    }

    #[test]
    fn test_platform_strings() {
        assert_eq!(
            PlatformFacts::new("linux", "x86_64").platform_string(),
            "linux-x86_64"
        );
        assert_eq!(PlatformFacts::new("linux", "x86").platform_string(), "linux-i686");
        assert_eq!(
            PlatformFacts::new("windows", "x86_64").platform_string(),
            "win-amd64"
        );
        assert_eq!(PlatformFacts::new("windows", "x86").platform_string(), "win32");
        assert_eq!(
            PlatformFacts::new("macos", "aarch64")
                .with_deployment_target("11.0")
                .platform_string(),
            "macosx-11.0-arm64"
        );
    }

    #[test]
    fn test_unknown_deployment_target_uses_minimum() {
        let unknown = PlatformFacts::new("macos", "x86_64");
        assert!(unknown.deployment_target_too_old());
        assert_eq!(unknown.platform_string(), "macosx-10.14-x86_64");

        let old = PlatformFacts::new("macos", "x86_64").with_deployment_target("10.9");
        assert!(old.deployment_target_too_old());
        assert_eq!(old.platform_string(), "macosx-10.14-x86_64");

        let garbled = PlatformFacts::new("macos", "x86_64").with_deployment_target("ten");
        assert_eq!(garbled.effective_deployment_target(), MIN_DEPLOYMENT_TARGET);

        let new = PlatformFacts::new("macos", "arm64").with_deployment_target("12.3");
        assert!(!new.deployment_target_too_old());
        assert_eq!(new.effective_deployment_target(), "12.3");
    }

    #[test]
    fn test_pointer_width() {
        assert!(PlatformFacts::new("windows", "x86_64").is_64bit());
        assert!(!PlatformFacts::new("windows", "x86").is_64bit());
    }
}
