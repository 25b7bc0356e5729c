//! Store configuration
//!
//! Loaded from TOML, then optionally overridden from the environment. Every
//! field has a default, so an empty file yields a usable document store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use libris_core::errors::{LibrisError, Result};
use libris_core::storage::BackendKind;
use serde::Deserialize;

pub const ENV_BACKEND: &str = "LIBRIS_BACKEND";
pub const ENV_DATABASE_PATH: &str = "LIBRIS_DATABASE_PATH";
pub const ENV_OP_TIMEOUT_MS: &str = "LIBRIS_OP_TIMEOUT_MS";

const DEFAULT_OP_TIMEOUT_MS: u64 = 3_000;

fn config_error(message: impl Into<String>) -> LibrisError {
    LibrisError::Config {
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// SQLite file, or directory of document collections; in-memory when absent
    pub database_path: Option<PathBuf>,
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Document,
            database_path: None,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// # Errors
    /// Returns `LibrisError::Config` if the text is not a valid store config.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| config_error(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Environment overrides are applied separately via `with_env_overrides()`.
    ///
    /// # Errors
    /// Returns `LibrisError::Config` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            config_error(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    ///
    /// # Errors
    /// Returns `LibrisError::Config` if an override does not parse.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_BACKEND) {
            self.backend = match raw.trim().to_ascii_lowercase().as_str() {
                "document" => BackendKind::Document,
                "sqlite" => BackendKind::Sqlite,
                other => {
                    return Err(config_error(format!(
                        "{} must be 'document' or 'sqlite', got '{}'",
                        ENV_BACKEND, other
                    )))
                }
            };
        }
        if let Some(raw) = lookup(ENV_DATABASE_PATH) {
            self.database_path = (!raw.trim().is_empty()).then(|| PathBuf::from(raw.trim()));
        }
        if let Some(raw) = lookup(ENV_OP_TIMEOUT_MS) {
            self.op_timeout_ms = raw.trim().parse().map_err(|e| {
                config_error(format!("{} is not a number of milliseconds: {}", ENV_OP_TIMEOUT_MS, e))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Apply `LIBRIS_*` variables from the process environment
    ///
    /// # Errors
    /// Returns `LibrisError::Config` if an override does not parse.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// # Errors
    /// Returns `LibrisError::Config` for a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.op_timeout_ms == 0 {
            return Err(config_error("op_timeout_ms cannot be 0"));
        }
        Ok(())
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.op_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(StoreConfig::from_toml_str("").unwrap(), StoreConfig::default());
    }

    #[test]
    fn test_parse_sqlite_config() {
        let config = StoreConfig::from_toml_str(
            r#"
            backend = "sqlite"
            database_path = "/var/lib/libris/catalog.db"
            op_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/libris/catalog.db"))
        );
        assert_eq!(config.op_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = StoreConfig::from_toml_str(r#"backend = "postgres""#).unwrap_err();
        assert!(matches!(err, LibrisError::Config { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(StoreConfig::from_toml_str("op_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND, "SQLite"),
            (ENV_DATABASE_PATH, "/tmp/override.db"),
            (ENV_OP_TIMEOUT_MS, "750"),
        ]
        .into_iter()
        .collect();

        let config = StoreConfig::default()
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/override.db")));
        assert_eq!(config.op_timeout_ms, 750);
    }

    #[test]
    fn test_bad_timeout_override() {
        let err = StoreConfig::default()
            .apply_overrides(|name| (name == ENV_OP_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_OP_TIMEOUT_MS));
    }
}
