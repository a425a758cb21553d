//! Configuration file support for ctbind.
//!
//! ctbind reads two configuration file locations:
//! - Global: `~/.ctbind/config.toml` - User-wide defaults
//! - Project: `.ctbind/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bindings::{EmitOptions, DEFAULT_FREE_FUNCTION, DEFAULT_SYMBOL_PREFIX};

/// ctbind configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Binding generation settings
    pub bindings: BindingsConfig,
}

/// Binding generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingsConfig {
    /// File name prefix of the shared library (e.g. "libmylib")
    pub library_prefix: Option<String>,

    /// Default output path of the generated module
    pub output: Option<PathBuf>,

    /// Prefix of exported native symbols (default "py_")
    pub symbol_prefix: Option<String>,

    /// Native function releasing error messages (default "free_error_message")
    pub free_function: Option<String>,
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
        if other.bindings.library_prefix.is_some() {
            self.bindings.library_prefix = other.bindings.library_prefix;
        }
        if other.bindings.output.is_some() {
            self.bindings.output = other.bindings.output;
        }
        if other.bindings.symbol_prefix.is_some() {
            self.bindings.symbol_prefix = other.bindings.symbol_prefix;
        }
        if other.bindings.free_function.is_some() {
            self.bindings.free_function = other.bindings.free_function;
        }
    }

    /// Build emitter options, or `None` if no library prefix is configured.
    pub fn emit_options(&self) -> Option<EmitOptions> {
        let prefix = self.bindings.library_prefix.as_ref()?;
        Some(
            EmitOptions::new(prefix.clone())
                .with_symbol_prefix(
                    self.bindings
                        .symbol_prefix
                        .as_deref()
                        .unwrap_or(DEFAULT_SYMBOL_PREFIX),
                )
                .with_free_function(
                    self.bindings
                        .free_function
                        .as_deref()
                        .unwrap_or(DEFAULT_FREE_FUNCTION),
                ),
        )
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ctbind/config.toml)
/// 2. Global config (~/.ctbind/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global ctbind config directory (~/.ctbind).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ctbind"))
}

/// Get the global config path (~/.ctbind/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ctbind/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ctbind").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.bindings.library_prefix.is_none());
        assert!(config.emit_options().is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[bindings]
library_prefix = "libmylib"
output = "mylib/_native.py"
symbol_prefix = "mylib_"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.bindings.library_prefix, Some("libmylib".to_string()));
        assert_eq!(
            config.bindings.output,
            Some(PathBuf::from("mylib/_native.py"))
        );

        let opts = config.emit_options().unwrap();
        assert_eq!(opts.library_prefix, "libmylib");
        assert_eq!(opts.symbol_prefix, "mylib_");
        assert_eq!(opts.free_function, DEFAULT_FREE_FUNCTION);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[bindings]\nprefix = \"lib\"\n").unwrap();

        assert!(Config::load(&config_path).is_err());
        // Broken files fall back to defaults.
        assert!(Config::load_or_default(&config_path)
            .bindings
            .library_prefix
            .is_none());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.bindings.library_prefix = Some("libbase".to_string());
        base.bindings.symbol_prefix = Some("base_".to_string());

        let mut override_cfg = Config::default();
        override_cfg.bindings.library_prefix = Some("libother".to_string());

        base.merge(override_cfg);

        assert_eq!(base.bindings.library_prefix, Some("libother".to_string()));
        assert_eq!(base.bindings.symbol_prefix, Some("base_".to_string())); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[bindings]
library_prefix = "libglobal"
free_function = "global_free"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[bindings]
library_prefix = "libproject"
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(
            config.bindings.library_prefix,
            Some("libproject".to_string())
        );
        assert_eq!(
            config.bindings.free_function,
            Some("global_free".to_string())
        );
    }
}
