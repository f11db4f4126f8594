//! Plan resolution error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::extension::MacroConflict;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fatal configuration inconsistency found while building a plan.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PlanError {
    #[error(transparent)]
    #[diagnostic(code(extplan::plan::macro_conflict))]
    MacroConflict(#[from] MacroConflict),

    #[error("source `{}` appears more than once in module `{module}`", .path.display())]
    #[diagnostic(code(extplan::plan::duplicate_source))]
    DuplicateSource { module: String, path: PathBuf },

    #[error("prebuilt core requested for module `{module}` but no prebuilt objects are configured")]
    #[diagnostic(code(extplan::plan::no_prebuilt_objects))]
    NoPrebuiltObjects { module: String },

    #[error("module `{module}` compiles core source `{}` while linking prebuilt core", .path.display())]
    #[diagnostic(code(extplan::plan::prebuilt_source_conflict))]
    PrebuiltSourceConflict { module: String, path: PathBuf },

    #[error("prebuilt core object not found: `{}`", .path.display())]
    #[diagnostic(code(extplan::plan::missing_prebuilt_object))]
    MissingPrebuiltObject { path: PathBuf },
}

fn display_value(value: &str) -> String {
    if value.is_empty() {
        "<no value>".to_string()
    } else {
        value.to_string()
    }
}

/// Where a conflicting macro comes from, for the diagnostic.
fn macro_origin(name: &str) -> String {
    let origin = match name {
        "OPENSSL_NO_ASM" => {
            "the assembly selection (GRPC_BUILD_WITH_BORING_SSL_ASM, GRPC_BUILD_OVERRIDE_BORING_SSL_ASM_PLATFORM)"
        }
        "CYTHON_TRACE_NOGIL" => "GRPC_PYTHON_ENABLE_CYTHON_TRACING",
        "GRPC_XDS_USER_AGENT_NAME_SUFFIX" | "GRPC_XDS_USER_AGENT_VERSION_SUFFIX" => {
            "the catalog manifest's [package] version"
        }
        "WIN32_LEAN_AND_MEAN" | "CARES_STATICLIB" | "GRPC_ARES" | "NTDDI_VERSION" | "NOMINMAX"
        | "MS_WIN64" => "the Windows platform definitions (check --os and --arch)",
        _ => "the platform definitions for the target (check --os and --arch)",
    };
    format!("`{}` is defined by {}; check that setting", name, origin)
}

impl PlanError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PlanError::MacroConflict(conflict) => Diagnostic::error(format!(
                "conflicting definitions for macro `{}`",
                conflict.name
            ))
            .with_context(format!("first defined as {}", display_value(&conflict.existing)))
            .with_context(format!("then redefined as {}", display_value(&conflict.requested)))
            .with_suggestion(macro_origin(&conflict.name))
            .with_suggestion(suggestions::SHOW_FLAGS),

            PlanError::DuplicateSource { module, path } => Diagnostic::error(format!(
                "source `{}` is listed more than once",
                path.display()
            ))
            .with_context(format!("while planning module `{}`", module))
            .with_suggestion("Remove the duplicate entry from the catalog manifest")
            .with_location(path),

            PlanError::NoPrebuiltObjects { module } => Diagnostic::error(
                "prebuilt core requested without prebuilt objects",
            )
            .with_context(format!("while planning module `{}`", module))
            .with_suggestion(suggestions::UNSET_PREBUILT),

            PlanError::PrebuiltSourceConflict { module, path } => Diagnostic::error(format!(
                "core source `{}` is compiled alongside prebuilt core",
                path.display()
            ))
            .with_context(format!("while planning module `{}`", module))
            .with_suggestion(suggestions::UNSET_PREBUILT)
            .with_location(path),

            PlanError::MissingPrebuiltObject { path } => {
                Diagnostic::error(format!("prebuilt core object not found: {}", path.display()))
                    .with_context("GRPC_PYTHON_USE_PREBUILT_GRPC_CORE links archives instead of compiling core")
                    .with_suggestion("Build gRPC core first so the archive exists under libs/<CONFIG>/")
                    .with_suggestion(suggestions::UNSET_PREBUILT)
                    .with_location(path)
            }
        }
    }
}
