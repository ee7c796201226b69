//! config
//!
//! Configuration value and loading.
//!
//! # Overview
//!
//! [`TruckConfig`] is an explicit value: it is handed to [`Truck`], which
//! passes it to every model class it builds. Nothing reads configuration
//! from global state.
//!
//! # Locations
//!
//! Searched in order:
//! 1. `$TRUCK_CONFIG` if set
//! 2. `<config_dir>/truck/config.toml` (`$XDG_CONFIG_HOME` on Linux)
//!
//! Missing files are not an error; defaults are used.
//!
//! # Example
//!
//! ```
//! use truck::config::TruckConfig;
//!
//! let config = TruckConfig::from_toml_str(r#"
//!     api = "https://example-api.dev/api"
//!
//!     [headers]
//!     X-Requested-With = "XMLHttpRequest"
//!
//!     [models.section]
//!     fields = ["name", "type"]
//! "#).unwrap();
//!
//! assert_eq!(config.api, "https://example-api.dev/api");
//!
//! let local = config.scoped(|c| c.api = "/api".to_string());
//! assert_eq!(local.api, "/api");
//! assert_eq!(config.api, "https://example-api.dev/api");
//! ```
//!
//! [`Truck`]: crate::Truck

pub mod schema;

pub use schema::{ModelDecl, RelationDecl};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TRUCK_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: TruckConfig,
    /// The file it came from, if any.
    pub path: Option<PathBuf>,
}

/// Library configuration.
///
/// # Example
///
/// ```toml
/// api = "https://example-api.dev/api"
/// drop_key = false
/// drop_parent_api_path = false
///
/// [headers]
/// X-Requested-With = "XMLHttpRequest"
///
/// [settings]
/// locale = "en"
///
/// [models.resume]
/// fields = ["name", "email"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TruckConfig {
    /// Base URL every model's path is joined to
    pub api: String,

    /// Default for models that do not set `drop_key`
    pub drop_key: bool,

    /// Default for models that do not set `drop_parent_api_path`
    pub drop_parent_api_path: bool,

    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Free-form values, read through `ModelClass::setting`
    pub settings: BTreeMap<String, Value>,

    /// Declarative model schemas by table name
    pub models: BTreeMap<String, ModelDecl>,
}

impl TruckConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the standard locations
    /// are searched.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load(path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let result = match path {
            Some(path) => ConfigLoadResult {
                config: Self::read_file(path)?,
                path: Some(path.to_path_buf()),
            },
            None => Self::discover()?,
        };

        result.config.validate()?;
        Ok(result)
    }

    /// Search the standard locations.
    fn discover() -> Result<ConfigLoadResult, ConfigError> {
        // 1. Check $TRUCK_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok(ConfigLoadResult {
                    config,
                    path: Some(path),
                });
            }
        }

        // 2. Check <config_dir>/truck/config.toml
        if let Some(path) = Self::default_path() {
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok(ConfigLoadResult {
                    config,
                    path: Some(path),
                });
            }
        }

        Ok(ConfigLoadResult {
            config: TruckConfig::default(),
            path: None,
        })
    }

    /// `<config_dir>/truck/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("truck").join("config.toml"))
    }

    fn read_file(path: &Path) -> Result<TruckConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<TruckConfig, ConfigError> {
        let config: TruckConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from("<string>"),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = self.api.as_str();
        let api_ok = api.is_empty()
            || api.starts_with('/')
            || api.starts_with("http://")
            || api.starts_with("https://");
        if !api_ok {
            return Err(ConfigError::InvalidValue(format!(
                "api must be an http(s) URL or start with '/', got '{}'",
                api
            )));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ConfigError::InvalidValue(format!("invalid header name '{}'", name))
            })?;
            HeaderValue::from_str(value).map_err(|_| {
                ConfigError::InvalidValue(format!("invalid value for header '{}'", name))
            })?;
        }

        for (table, decl) in &self.models {
            decl.validate(table)?;
            if let Some(missing) = decl.dependencies().find(|m| !self.models.contains_key(*m)) {
                return Err(ConfigError::InvalidValue(format!(
                    "models.{} refers to undeclared model '{}'",
                    table, missing
                )));
            }
        }

        Ok(())
    }

    /// A copy with `f` applied, leaving `self` untouched.
    pub fn scoped<F>(&self, f: F) -> TruckConfig
    where
        F: FnOnce(&mut TruckConfig),
    {
        let mut copy = self.clone();
        f(&mut copy);
        copy
    }

    /// A copy with a different base URL.
    pub fn with_api(&self, api: impl Into<String>) -> TruckConfig {
        let api = api.into();
        self.scoped(|c| c.api = api)
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn set_setting(&mut self, key: impl Into<String>, value: Value) {
        self.settings.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = TruckConfig::default();
        assert_eq!(config.api, "");
        assert!(!config.drop_key);
        assert!(config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            api = "https://example-api.dev/api"
            drop_parent_api_path = true

            [settings]
            locale = "en"
            "#,
        )
        .unwrap();

        let result = TruckConfig::load(Some(&path)).unwrap();
        assert_eq!(result.path.as_deref(), Some(path.as_path()));
        assert_eq!(result.config.api, "https://example-api.dev/api");
        assert!(result.config.drop_parent_api_path);
        assert_eq!(result.config.setting("locale"), Some(&json!("en")));
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let result = TruckConfig::load(Some(&temp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn load_from_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("truck.toml");
        fs::write(&path, "api = \"/api\"").unwrap();

        std::env::set_var(CONFIG_ENV, path.to_str().unwrap());
        let result = TruckConfig::load(None).unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(result.config.api, "/api");
        assert_eq!(result.path, Some(path));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = TruckConfig::from_toml_str("apii = \"/api\"");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(TruckConfig::from_toml_str("api = \"ftp://x\"").is_err());
        assert!(TruckConfig::from_toml_str("[headers]\n\"bad header\" = \"x\"").is_err());
        assert!(TruckConfig::from_toml_str(
            r#"
            [models.resume.has_many.sections]
            model = "section"
            "#
        )
        .is_err());
    }

    #[test]
    fn scoped_and_with_api_copy() {
        let config = TruckConfig::default();
        let scoped = config.scoped(|c| c.set_setting("debug", json!(true)));
        assert_eq!(scoped.setting("debug"), Some(&json!(true)));
        assert!(config.setting("debug").is_none());

        assert_eq!(config.with_api("/v2").api, "/v2");
    }
}
