//! Configuration file support for extplan.
//!
//! Build knobs can be pinned in two configuration file locations:
//! - Global: `~/.extplan/config.toml` - User-wide defaults
//! - Project: `.extplan/config.toml` - Project-specific overrides
//!
//! Both hold an `[env]` table with the same variable names the build reads
//! from the environment. Precedence, lowest first: global file, project
//! file, process environment, `--env` flags on the command line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::toggles::{RawEnv, KNOBS};

/// A value in the `[env]` table. Booleans and integers are accepted for
/// convenience and converted to the strings the environment would carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl EnvValue {
    pub fn to_env_string(&self) -> String {
        match self {
            EnvValue::Bool(true) => "True".to_string(),
            EnvValue::Bool(false) => "False".to_string(),
            EnvValue::Integer(n) => n.to_string(),
            EnvValue::String(s) => s.clone(),
        }
    }
}

/// extplan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build knob values
    pub env: BTreeMap<String, EnvValue>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        self.env.extend(other.env);
    }

    /// The `[env]` table as raw environment strings.
    pub fn raw_env(&self) -> RawEnv {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), v.to_env_string()))
            .collect()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.extplan/config.toml)
/// 2. Global config (~/.extplan/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global extplan config directory (~/.extplan).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extplan"))
}

/// Get the global config path (~/.extplan/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.extplan/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".extplan").join("config.toml")
}

/// Collect the recognised build variables from a process environment.
pub fn process_env(lookup: impl Fn(&str) -> Option<String>) -> RawEnv {
    KNOBS
        .iter()
        .filter_map(|knob| lookup(knob.var).map(|value| (knob.var.to_string(), value)))
        .collect()
}

/// Parse a `KEY=VALUE` command-line pair. The value may be empty.
pub fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("invalid environment override `{}`, expected KEY=VALUE", pair),
    }
}

/// Merge layers into the raw environment, later layers winning.
pub fn layer_env(layers: impl IntoIterator<Item = RawEnv>) -> RawEnv {
    let mut env = RawEnv::new();
    for layer in layers {
        env.extend(layer);
    }
    env
}
