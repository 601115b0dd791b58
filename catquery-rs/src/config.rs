//! Configuration for the catquery CLI and batch classifier.
//!
//! Looked up in order: an explicit `--config` path, `$CATQUERY_CONFIG`,
//! `<config dir>/catquery/config.toml`, then built-in defaults.

use crate::error::{CatQueryError, Result};
use crate::query::types::{Limits, QueryOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CATQUERY_CONFIG";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Structural limits applied when compiling queries.
    pub limits: Limits,
    /// Query options used when a category or CLI call gives none.
    pub defaults: QueryOptions,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for batch classification (rayon's default if unset).
    pub threads: Option<usize>,
}

impl Config {
    /// Load configuration following the lookup order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let default = default_config_path();

        match resolve_path(explicit, env, default) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatQueryError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| CatQueryError::ConfigError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and check a TOML document.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> std::result::Result<(), String> {
        let limits = [
            ("max_query_length", self.limits.max_query_length),
            ("max_terms", self.limits.max_terms),
            ("max_depth", self.limits.max_depth),
            ("max_phrase_length", self.limits.max_phrase_length),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(format!("limits.{} must be at least 1", name));
            }
        }
        if self.batch.threads == Some(0) {
            return Err("batch.threads must be at least 1".to_string());
        }
        Ok(())
    }
}

/// `<config dir>/catquery/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("catquery").join("config.toml"))
}

/// Pick the config file to read.
///
/// Explicit and environment paths are returned even when missing so the
/// caller reports them; the default location is only used if it exists.
fn resolve_path(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    default.filter(|p| p.is_file())
}
