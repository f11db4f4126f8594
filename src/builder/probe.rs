//! Toolchain probes.
//!
//! A probe answers "does this compile and link?" by actually running the
//! compiler. It is the only part of plan resolution that shells out, so it
//! sits behind [`CompileProbe`] and is memoized for one resolution.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::util::process::{find_executable, ProcessBuilder};

/// Minimal program exercising 64-bit atomics.
pub const ATOMIC_PROBE_SOURCE: &str =
    "#include <atomic>\n#include <cstdint>\nint main() { return std::atomic<int64_t>{}; }\n";

/// Library some toolchains need for 64-bit atomics.
pub const ATOMIC_LIBRARY_FLAG: &str = "-latomic";

/// Compile-and-link oracle.
pub trait CompileProbe {
    /// Whether the probe program compiles and links with `extra_flags`
    /// appended. A toolchain that cannot run at all answers `false`.
    fn probe(&self, extra_flags: &[String]) -> bool;
}

/// Probes by invoking a real C++ compiler.
#[derive(Debug, Clone)]
pub struct ToolchainProbe {
    compiler: Vec<String>,
}

impl ToolchainProbe {
    /// Probe the atomics program with `compiler` (program plus leading
    /// arguments, e.g. `["ccache", "g++"]`).
    pub fn new(compiler: Vec<String>) -> Self {
        ToolchainProbe { compiler }
    }
}

impl CompileProbe for ToolchainProbe {
    fn probe(&self, extra_flags: &[String]) -> bool {
        let Some((program, leading)) = self.compiler.split_first() else {
            tracing::warn!("no compiler configured for probing, assuming probe failed");
            return false;
        };

        if find_executable(program).is_none() {
            tracing::warn!("probe compiler `{}` not found, assuming probe failed", program);
            return false;
        }

        let out_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("failed to create probe directory: {}", e);
                return false;
            }
        };
        let output = out_dir.path().join("probe.out");

        let cmd = ProcessBuilder::new(program)
            .args(leading)
            .args(["-x", "c++", "-std=c++14", "-", "-o"])
            .arg(&output)
            .args(extra_flags)
            .cwd(out_dir.path())
            .stdin(ATOMIC_PROBE_SOURCE);

        tracing::debug!("probing: {}", cmd.display_command());

        match cmd.exec() {
            Ok(result) => result.status.success(),
            Err(e) => {
                tracing::warn!("probe could not run: {:#}", e);
                false
            }
        }
    }
}

/// Probe that never runs the toolchain and assumes every link succeeds.
///
/// Used when probing is turned off, which keeps plans reproducible across
/// machines at the cost of never adding `-latomic`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeLinks;

impl CompileProbe for AssumeLinks {
    fn probe(&self, _extra_flags: &[String]) -> bool {
        true
    }
}

/// Caches probe answers per flag set for the lifetime of one resolution.
#[derive(Debug)]
pub struct MemoizedProbe<P> {
    inner: P,
    answers: RefCell<HashMap<Vec<String>, bool>>,
}

impl<P: CompileProbe> MemoizedProbe<P> {
    pub fn new(inner: P) -> Self {
        MemoizedProbe {
            inner,
            answers: RefCell::new(HashMap::new()),
        }
    }
}

impl<P: CompileProbe> CompileProbe for MemoizedProbe<P> {
    fn probe(&self, extra_flags: &[String]) -> bool {
        if let Some(answer) = self.answers.borrow().get(extra_flags) {
            return *answer;
        }

        let answer = self.inner.probe(extra_flags);
        self.answers
            .borrow_mut()
            .insert(extra_flags.to_vec(), answer);
        answer
    }
}

/// Decide whether the atomics library must be linked.
///
/// If the probe program links without extra libraries the answer is no.
/// Otherwise the library is only added when it actually fixes the link;
/// if it does not, the final link is left to fail on its own.
pub fn needs_libatomic(probe: &dyn CompileProbe) -> bool {
    if probe.probe(&[]) {
        return false;
    }

    let fixed = probe.probe(&[ATOMIC_LIBRARY_FLAG.to_string()]);
    if !fixed {
        tracing::debug!("{} does not fix the atomics probe, not linking it", ATOMIC_LIBRARY_FLAG);
    }
    fixed
}
