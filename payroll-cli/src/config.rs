//! TOML configuration for `png-payroll`.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "payroll.db"
//!
//! [logging]
//! level = "info"
//! file = "png-payroll.log"
//!
//! [payroll]
//! default_tax_year = 2025
//! ```
//!
//! Every section and key is optional. A missing file yields the defaults.

use std::path::{Path, PathBuf};

use payroll_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "PNG_PAYROLL_CONFIG";

/// File looked up in the working directory when neither `--config` nor
/// [`CONFIG_ENV_VAR`] is given.
pub const DEFAULT_CONFIG_FILE: &str = "png-payroll.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or EnvFilter directive. `RUST_LOG` overrides it.
    pub level: String,
    /// Log file, appended to. No file logging when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollConfig {
    pub default_tax_year: i32,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            default_tax_year: 2025,
        }
    }
}

/// `[database]` section. Defaults to a `payroll.db` file rather than the
/// in-memory database `DbConfig` defaults to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "payroll.db".to_string(),
        }
    }
}

impl From<DatabaseConfig> for DbConfig {
    fn from(section: DatabaseConfig) -> Self {
        DbConfig {
            backend: section.backend,
            connection_string: section.connection_string,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub payroll: PayrollConfig,
}

impl AppConfig {
    /// Parses a TOML document. Keys not present keep their defaults.
    pub fn from_toml_str(
        input: &str,
        origin: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads the config file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Locates and loads the configuration.
    ///
    /// An explicit path, or one named by [`CONFIG_ENV_VAR`], must exist.
    /// Otherwise [`DEFAULT_CONFIG_FILE`] is read if present, and the
    /// defaults are used if it is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_from(explicit, env_path.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    fn load_from(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        fallback: &Path,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit.or(env_path) {
            debug!(path = %path.display(), "loading config");
            return Self::from_file(path);
        }
        if fallback.is_file() {
            debug!(path = %fallback.display(), "loading config");
            return Self::from_file(fallback);
        }
        debug!("no config file; using defaults");
        Ok(Self::default())
    }
}
