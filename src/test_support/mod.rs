//! Test doubles for the collaborators plan resolution talks to.
//!
//! The compile probe and library discovery touch the toolchain and the
//! filesystem; these stand-ins answer from fixed data and record what they
//! were asked.

pub mod fixtures;

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::builder::discovery::LibraryDiscovery;
use crate::builder::probe::{CompileProbe, ATOMIC_LIBRARY_FLAG};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Compile probe with canned answers.
///
/// `link_plain` answers the probe with no extra flags, `link_with_atomic`
/// answers it when `-latomic` is passed.
#[derive(Debug, Default)]
pub struct StubProbe {
    link_plain: bool,
    link_with_atomic: bool,
    calls: RefCell<Vec<Vec<String>>>,
}

impl StubProbe {
    pub fn new(link_plain: bool, link_with_atomic: bool) -> Self {
        StubProbe {
            link_plain,
            link_with_atomic,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Flag sets the probe was called with, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl CompileProbe for StubProbe {
    fn probe(&self, extra_flags: &[String]) -> bool {
        self.calls.borrow_mut().push(extra_flags.to_vec());
        if extra_flags.iter().any(|f| f == ATOMIC_LIBRARY_FLAG) {
            self.link_with_atomic
        } else {
            self.link_plain
        }
    }
}

/// Library discovery returning a fixed set of names.
#[derive(Debug, Default)]
pub struct FakeDiscovery {
    names: BTreeSet<String>,
    patterns: RefCell<Vec<String>>,
}

impl FakeDiscovery {
    pub fn new(names: &[&str]) -> Self {
        FakeDiscovery {
            names: names.iter().map(|n| n.to_string()).collect(),
            patterns: RefCell::new(Vec::new()),
        }
    }

    /// Patterns discovery was asked for, in order.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns.borrow().clone()
    }
}

impl LibraryDiscovery for FakeDiscovery {
    fn discover(&self, pattern: &str) -> BTreeSet<String> {
        self.patterns.borrow_mut().push(pattern.to_string());
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::DependencyGroup;

    #[test]
    fn test_sample_catalog_covers_every_group() {
        let counts = sample_catalog().sources.group_counts();
        for group in DependencyGroup::OPTIONAL {
            assert!(counts.get(&group).copied().unwrap_or(0) > 0, "{group} missing");
        }
        assert!(counts[&DependencyGroup::None] > 0);
    }

    #[test]
    fn test_stub_probe_records_calls() {
        let probe = StubProbe::new(false, true);
        assert!(!probe.probe(&[]));
        assert!(probe.probe(&["-latomic".to_string()]));
        assert_eq!(probe.calls().len(), 2);
    }
}
