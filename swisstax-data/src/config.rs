//! TOML configuration shared by the CLIs.
//!
//! ```toml
//! log_level = "debug"
//! log_file = "swisstax.log"
//! seeds_dir = "swisstax-db-sqlite/seeds"
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "rates.db"
//! ```
//!
//! Every key is optional. Command-line flags win over file values.
//! `seeds_dir` is read by the loader; the SQLite backend factory used by
//! `swisstax-calc` resolves seeds through `SWISSTAX_SEEDS_DIR`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use swisstax_core::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DbConfig,
    pub seeds_dir: Option<PathBuf>,
    /// Bare level or full `EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig::sqlite("rates.db"),
            seeds_dir: None,
            log_level: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// File config when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").expect("empty config parses");

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database.backend, "sqlite");
    }

    #[test]
    fn full_file_overrides_every_key() {
        let config = AppConfig::from_toml(
            r#"
            log_level = "debug"
            log_file = "calc.log"
            seeds_dir = "seeds"

            [database]
            backend = "sqlite"
            connection_string = ":memory:"
            "#,
        )
        .expect("config parses");

        assert_eq!(
            config,
            AppConfig {
                database: DbConfig::sqlite(":memory:"),
                seeds_dir: Some(PathBuf::from("seeds")),
                log_level: Some("debug".to_string()),
                log_file: Some(PathBuf::from("calc.log")),
            }
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = AppConfig::from_toml("log_levle = \"debug\"").expect_err("typo is caught");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/swisstax.toml")))
            .expect_err("missing file");

        assert!(err.to_string().contains("/nonexistent/swisstax.toml"));
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = AppConfig::load(None).expect("defaults");

        assert_eq!(config, AppConfig::default());
    }
}
