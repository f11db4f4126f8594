//! Resolved per-module build plan.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A preprocessor definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// Render as a GCC-style `-D` flag.
    pub fn to_flag(&self) -> String {
        match &self.value {
            Some(v) => format!("-D{}={}", self.name, v),
            None => format!("-D{}", self.name),
        }
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A macro redefined with a different value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting definitions for macro `{name}`")]
pub struct MacroConflict {
    pub name: String,
    /// First value, empty for a bare definition
    pub existing: String,
    /// Rejected value, empty for a bare definition
    pub requested: String,
}

/// Ordered macro definitions.
///
/// Redefining a macro with the same value is a no-op. Redefining it with a
/// different value is a [`MacroConflict`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroSet(Vec<Define>);

impl MacroSet {
    pub fn new() -> Self {
        MacroSet(Vec::new())
    }

    /// Add a definition.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Result<(), MacroConflict> {
        let name = name.into();
        let value = value.map(Into::into);

        if let Some(existing) = self.0.iter().find(|d| d.name == name) {
            if existing.value == value {
                return Ok(());
            }
            return Err(MacroConflict {
                name,
                existing: existing.value.clone().unwrap_or_default(),
                requested: value.unwrap_or_default(),
            });
        }

        self.0.push(Define { name, value });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Define> {
        self.0.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Define> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Push `item` unless it is already present, preserving insertion order.
pub fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// The fully resolved build description of one native module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSpec {
    /// Dotted module name
    pub name: String,
    /// Sources in compile order, no duplicates
    pub sources: Vec<PathBuf>,
    /// Include search path, in search order
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor definitions
    pub define_macros: MacroSet,
    /// Libraries to link (without `-l`)
    pub libraries: Vec<String>,
    /// Prebuilt archives linked in place of core sources
    pub extra_objects: Vec<PathBuf>,
    /// Extra compiler arguments
    pub extra_compile_args: Vec<String>,
    /// Extra linker arguments
    pub extra_link_args: Vec<String>,
}
