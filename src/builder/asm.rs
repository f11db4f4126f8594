//! BoringSSL assembly selection.
//!
//! Every input combination lands in exactly one [`AsmOutcome`]:
//!
//! - `Disabled`: assembly turned off, or system OpenSSL replaces BoringSSL.
//!   `OPENSSL_NO_ASM` is defined so the portable C code is used.
//! - `Unsupported`: the target has no gas-compatible assembler (Windows).
//!   Assembly is simply omitted; no macro is defined.
//! - `Enabled`: the gas assembly group is compiled and BoringSSL's own
//!   preprocessor conditionals pick the per-architecture variants.

use serde::{Deserialize, Serialize};

use crate::core::catalog::GAS_ASM_GROUP;
use crate::core::platform::PlatformFacts;
use crate::core::toggles::BuildConfiguration;

/// Macro that makes BoringSSL fall back to portable C.
pub const DISABLE_ASM_MACRO: &str = "OPENSSL_NO_ASM";

/// Platform marker for 32-bit x86 targets that need SSE2 enabled.
const SSE2_MARKER: &str = "i686";

/// Terminal outcome of assembly selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AsmOutcome {
    Disabled,
    Unsupported,
    Enabled,
}

/// Result of assembly selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmSelection {
    pub outcome: AsmOutcome,
    /// Effective target platform string; absent when disabled
    pub platform: Option<String>,
    /// Catalog assembly group to compile
    pub source_group: Option<String>,
    /// Macro to define (`OPENSSL_NO_ASM=1`)
    pub disable_macro: Option<(String, String)>,
    /// Extra compiler flags (`-msse2` on i686)
    pub extra_compile_flags: Vec<String>,
}

impl AsmSelection {
    fn disabled() -> Self {
        AsmSelection {
            outcome: AsmOutcome::Disabled,
            platform: None,
            source_group: None,
            disable_macro: Some((DISABLE_ASM_MACRO.to_string(), "1".to_string())),
            extra_compile_flags: Vec::new(),
        }
    }
}

/// Select assembly sources for the target.
///
/// `override_platform` (when non-empty) replaces the host platform string,
/// which is how cross builds pick the right variant.
pub fn select_assembly(
    platform: &PlatformFacts,
    config: &BuildConfiguration,
    override_platform: Option<&str>,
) -> AsmSelection {
    if !config.enable_assembly() || config.use_system_tls() {
        tracing::debug!("BoringSSL assembly disabled");
        return AsmSelection::disabled();
    }

    let override_platform = override_platform.filter(|p| !p.is_empty());
    let target = override_platform
        .map(str::to_string)
        .unwrap_or_else(|| platform.platform_string());

    let mut extra_compile_flags = Vec::new();
    if target.contains(SSE2_MARKER) {
        tracing::info!("Enabling SSE2 on {} platform", target);
        extra_compile_flags.push("-msse2".to_string());
    } else {
        tracing::debug!("SSE2 not enabled on {} platform", target);
    }

    let host_lacks_gas = override_platform.is_none() && !platform.has_gas_assembler;
    if target.starts_with("win") || host_lacks_gas {
        tracing::info!("ASM builds for BoringSSL currently not supported on: {}", target);
        return AsmSelection {
            outcome: AsmOutcome::Unsupported,
            platform: Some(target),
            source_group: None,
            disable_macro: None,
            extra_compile_flags,
        };
    }

    AsmSelection {
        outcome: AsmOutcome::Enabled,
        platform: Some(target),
        source_group: Some(GAS_ASM_GROUP.to_string()),
        disable_macro: None,
        extra_compile_flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::toggles::{vars, RawEnv};
    use crate::test_support::{darwin, linux, windows};

    fn config(pairs: &[(&str, &str)]) -> BuildConfiguration {
        let raw: RawEnv = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BuildConfiguration::resolve(&raw)
    }

    #[test]
    fn test_default_linux_is_enabled() {
        let selection = select_assembly(&linux(), &config(&[]), None);
        assert_eq!(selection.outcome, AsmOutcome::Enabled);
        assert_eq!(selection.source_group.as_deref(), Some(GAS_ASM_GROUP));
        assert_eq!(selection.disable_macro, None);
        assert!(selection.extra_compile_flags.is_empty());
    }

    #[test]
    fn test_disabled_by_toggle() {
        let selection = select_assembly(&linux(), &config(&[(vars::BORING_SSL_ASM, "False")]), None);
        assert_eq!(selection.outcome, AsmOutcome::Disabled);
        assert_eq!(
            selection.disable_macro,
            Some(("OPENSSL_NO_ASM".to_string(), "1".to_string()))
        );
        assert_eq!(selection.source_group, None);
    }

    #[test]
    fn test_disabled_by_system_openssl() {
        let selection = select_assembly(&linux(), &config(&[(vars::SYSTEM_OPENSSL, "1")]), None);
        assert_eq!(selection.outcome, AsmOutcome::Disabled);
    }

    #[test]
    fn test_windows_override_is_unsupported_without_macro() {
        let selection = select_assembly(&linux(), &config(&[]), Some("win-amd64"));
        assert_eq!(selection.outcome, AsmOutcome::Unsupported);
        assert_eq!(selection.disable_macro, None);
        assert_eq!(selection.source_group, None);
    }

    #[test]
    fn test_windows_host_is_unsupported() {
        let selection = select_assembly(&windows(), &config(&[]), None);
        assert_eq!(selection.outcome, AsmOutcome::Unsupported);
    }

    #[test]
    fn test_override_enables_cross_target() {
        let selection = select_assembly(&windows(), &config(&[]), Some("linux-aarch64"));
        assert_eq!(selection.outcome, AsmOutcome::Enabled);
        assert_eq!(selection.platform.as_deref(), Some("linux-aarch64"));
    }

    #[test]
    fn test_i686_enables_sse2() {
        let selection = select_assembly(&linux(), &config(&[]), Some("linux-i686"));
        assert_eq!(selection.outcome, AsmOutcome::Enabled);
        assert_eq!(selection.extra_compile_flags, vec!["-msse2".to_string()]);
    }

    #[test]
    fn test_empty_override_uses_host() {
        let selection = select_assembly(&darwin(), &config(&[]), Some(""));
        assert!(selection.platform.unwrap().starts_with("macosx-"));
    }

    #[test]
    fn test_every_combination_has_one_outcome() {
        let platforms = [linux(), darwin(), windows(), PlatformFacts::new("freebsd", "x86")];
        let overrides = [None, Some(""), Some("win32"), Some("linux-i686"), Some("linux-aarch64")];

        for platform in &platforms {
            for asm in ["True", "False"] {
                for system_tls in ["True", "False"] {
                    let config = config(&[
                        (vars::BORING_SSL_ASM, asm),
                        (vars::SYSTEM_OPENSSL, system_tls),
                    ]);
                    for override_platform in overrides {
                        let s = select_assembly(platform, &config, override_platform);
                        match s.outcome {
                            AsmOutcome::Disabled => {
                                assert!(s.disable_macro.is_some() && s.source_group.is_none())
                            }
                            AsmOutcome::Unsupported => {
                                assert!(s.disable_macro.is_none() && s.source_group.is_none())
                            }
                            AsmOutcome::Enabled => {
                                assert!(s.disable_macro.is_none() && s.source_group.is_some())
                            }
                        }
                    }
                }
            }
        }
    }
}
