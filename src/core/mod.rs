//! Core data structures for extplan.
//!
//! This module contains the foundational types plan resolution works on:
//! - Platform facts
//! - Build toggles and the resolved configuration
//! - The module and source catalog
//! - Extension specs

pub mod catalog;
pub mod extension;
pub mod platform;
pub mod toggles;

pub use catalog::{Catalog, DependencyGroup, ModuleDecl, SourceCatalog, SourceEntry, MANIFEST_NAME};
pub use extension::{Define, ExtensionSpec, MacroConflict, MacroSet};
pub use platform::{OsFamily, PlatformFacts};
pub use toggles::{BuildConfiguration, RawEnv};
