//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/outliner/outliner.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `OUTLINER_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::{LoadPolicy, DEFAULT_JSON_INDENT};
use crate::application::ApplicationError;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "OUTLINER";

/// Raw settings for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub storage_dir: Option<PathBuf>,
    pub json_indent: Option<usize>,
    pub print_indent: Option<String>,
    pub load_policy: Option<LoadPolicy>,
}

/// Unified configuration for outliner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one `<title>.json` file per root entry
    pub storage_dir: PathBuf,
    /// Spaces per level in written JSON files
    pub json_indent: usize,
    /// Prefix repeated once per level by the plain tree printer
    pub print_indent: String,
    /// Handling of malformed files during a bulk load
    pub load_policy: LoadPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            json_indent: DEFAULT_JSON_INDENT,
            print_indent: "\t".to_string(),
            load_policy: LoadPolicy::default(),
        }
    }
}

/// Get the default storage directory (platform data dir).
fn default_storage_dir() -> PathBuf {
    ProjectDirs::from("", "", "outliner")
        .map(|dirs| dirs.data_dir().join("entries"))
        .unwrap_or_else(|| PathBuf::from("~/.outliner/entries"))
}

/// Get the XDG config directory for outliner.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "outliner").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("outliner.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Expand shell variables and tilde in a path string.
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in the storage directory.
    fn expand_paths(&mut self) {
        let expanded = expand_path(self.storage_dir.to_string_lossy().as_ref());
        self.storage_dir = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            storage_dir: overlay
                .storage_dir
                .clone()
                .unwrap_or_else(|| self.storage_dir.clone()),
            json_indent: overlay.json_indent.unwrap_or(self.json_indent),
            print_indent: overlay
                .print_indent
                .clone()
                .unwrap_or_else(|| self.print_indent.clone()),
            load_policy: overlay.load_policy.unwrap_or(self.load_policy),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        Self::load_layers(global.as_deref(), config_file, None)
    }

    /// Load settings from explicit layers.
    ///
    /// `env` replaces the process environment as the source of
    /// `OUTLINER_*` overrides when given.
    pub fn load_layers(
        global: Option<&Path>,
        config_file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config, only if present
        if let Some(global_path) = global {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current, env)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply OUTLINER_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("storage_dir") {
            settings.storage_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("json_indent") {
            settings.json_indent = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("{}_JSON_INDENT: {}", ENV_PREFIX, e),
            })?;
        }
        if let Ok(val) = config.get_string("print_indent") {
            settings.print_indent = val;
        }
        if let Ok(val) = config.get_string("load_policy") {
            settings.load_policy = val.parse().map_err(|message: String| {
                ApplicationError::Config { message }
            })?;
        }

        Ok(settings)
    }

    /// Render as TOML for display.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
