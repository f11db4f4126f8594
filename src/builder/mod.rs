//! Extension plan building.
//!
//! Source filtering, flag assembly, assembly selection and the plan builder
//! that composes them, plus the probe and discovery seams they consult.

pub mod asm;
pub mod codegen;
pub mod discovery;
pub mod errors;
pub mod filter;
pub mod flags;
pub mod plan;
pub mod probe;

pub use asm::{select_assembly, AsmOutcome, AsmSelection};
pub use codegen::{CodegenDecision, CodegenOracle, FsCodegenOracle};
pub use discovery::{GlobLibraryDiscovery, LibraryDiscovery};
pub use errors::PlanError;
pub use filter::filter_sources;
pub use flags::{AssembledFlags, FlagAssembler};
pub use plan::BuildPlan;
pub use probe::{CompileProbe, MemoizedProbe, ToolchainProbe};
