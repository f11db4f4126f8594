//! High-level operations.
//!
//! This module contains the implementation of extplan commands.

pub mod resolve_plan;
pub mod stage;

pub use resolve_plan::{resolve, resolve_plan, Resolution, ResolveOptions};
pub use stage::{stage, StageReport};
