//! Decides whether Cython templates must be regenerated.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::catalog::ModuleDecl;
use crate::core::toggles::BuildConfiguration;

/// Answers whether previously generated sources can be reused.
pub trait CodegenOracle {
    fn generated_sources_fresh(&self, modules: &[ModuleDecl]) -> bool;
}

/// Treats generated sources as fresh when every module's generated `.cpp`
/// exists under the project root.
pub struct FsCodegenOracle {
    root: PathBuf,
}

impl FsCodegenOracle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsCodegenOracle { root: root.into() }
    }
}

impl CodegenOracle for FsCodegenOracle {
    fn generated_sources_fresh(&self, modules: &[ModuleDecl]) -> bool {
        modules.iter().all(|module| {
            let generated = self.root.join(module.generated_source());
            let exists = generated.is_file();
            if !exists {
                tracing::debug!("generated source {} is missing", generated.display());
            }
            exists
        })
    }
}

/// Outcome of the codegen check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenDecision {
    /// Compile the `.pyx` templates instead of the generated `.cpp` files
    pub regenerate: bool,
    /// Regeneration was requested explicitly; a missing code generator is
    /// fatal rather than a fallback
    pub mandatory: bool,
    /// Emit line tracing hooks in generated code
    pub line_tracing: bool,
}

impl CodegenDecision {
    pub fn decide(
        config: &BuildConfiguration,
        modules: &[ModuleDecl],
        oracle: &dyn CodegenOracle,
    ) -> Self {
        let regenerate = config.force_codegen() || !oracle.generated_sources_fresh(modules);
        if regenerate && !config.force_codegen() {
            tracing::info!("generated sources are missing, regenerating from templates");
        }
        CodegenDecision {
            regenerate,
            mandatory: config.force_codegen(),
            line_tracing: config.enable_tracing(),
        }
    }
}
