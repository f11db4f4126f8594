//! extplan - build-plan resolution for native Python extensions over gRPC core
//!
//! This crate turns a module catalog, the host platform and a set of build
//! knobs into a complete, deterministic description of every native
//! extension module: sources, include paths, macros, flags and libraries.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test doubles and fixtures for extplan unit tests.
///
/// Only available when compiling tests. Provides a stub compile probe,
/// a fake library discovery and a sample catalog.
#[cfg(test)]
pub mod test_support;

pub use crate::builder::{BuildPlan, PlanError};
pub use crate::core::{BuildConfiguration, Catalog, ExtensionSpec, PlatformFacts};
