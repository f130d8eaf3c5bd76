//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! doltrun has two configuration scopes:
//! - **Global**: User-level settings (typically connection defaults)
//! - **Project**: `doltrun.toml` in the working directory
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. `DOLTRUN_PASSWORD` (password only)
//! 5. CLI flags (see [`StoreOverrides`])
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$DOLTRUN_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/doltrun/config.toml`
//! 3. `~/.doltrun/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use doltrun::core::config::{Config, StoreOverrides};
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! let endpoint = config.endpoint(&StoreOverrides::default()).unwrap();
//! println!("Database: {}", endpoint);
//! println!("Branch policy: {}", config.branch_policy());
//! ```

pub mod schema;

pub use schema::{FileConfig, MessageSection, RunSection, StoreSection};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::message::{MessageStyle, StyledMessage, DEFAULT_SOURCE};
use crate::core::types::{BranchPolicy, DatabaseName};
use crate::store::StoreEndpoint;

/// Name of the project config file.
pub const PROJECT_FILE: &str = "doltrun.toml";

/// Environment variable overriding the global config path.
pub const CONFIG_ENV: &str = "DOLTRUN_CONFIG";

/// Environment variable overriding the store password.
pub const PASSWORD_ENV: &str = "DOLTRUN_PASSWORD";

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

    #[error("no database configured; set store.database in doltrun.toml or pass --database")]
    MissingDatabase,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Connection values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct StoreOverrides {
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules: project config overrides global
/// config, and both override the defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: FileConfig,
    /// Project configuration (if a project file exists)
    pub project: Option<FileConfig>,
    /// Password from the environment
    password_env: Option<String>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads `doltrun.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let global_path = Self::find_global();
        let mut result = Self::load_paths(global_path.as_deref(), project_dir)?;
        result.config.password_env = std::env::var(PASSWORD_ENV).ok();
        Ok(result)
    }

    /// Load configuration from explicit locations, ignoring the environment.
    pub fn load_paths(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_path {
            Some(path) if path.exists() => (Self::read_file(path)?, Some(path.to_path_buf())),
            _ => (FileConfig::default(), None),
        };

        let (project, project_path) = match project_dir.map(|d| d.join(PROJECT_FILE)) {
            Some(path) if path.exists() => {
                let config = Self::read_file(&path)?;
                if config.has_password() {
                    warnings.push(ConfigWarning {
                        message: format!(
                            "project config stores a password; prefer {PASSWORD_ENV}"
                        ),
                        path: path.clone(),
                    });
                }
                (Some(config), Some(path))
            }
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                password_env: None,
                global_path,
                project_path,
            },
            warnings,
        })
    }

    fn find_global() -> Option<PathBuf> {
        // 1. Check $DOLTRUN_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        // 2. Check $XDG_CONFIG_HOME/doltrun/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("doltrun/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.doltrun/config.toml
        dirs::home_dir().map(|home| home.join(".doltrun/config.toml"))
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the global config file, if one was loaded.
    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Path of the project config file, if one was loaded.
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Pick the first value set in project, then global config.
    fn pick<T, F>(&self, get: F) -> Option<T>
    where
        F: Fn(&FileConfig) -> Option<T>,
    {
        self.project.as_ref().and_then(&get).or_else(|| get(&self.global))
    }

    /// Get the configured database name.
    pub fn database(&self) -> Option<String> {
        self.pick(|c| c.store.as_ref()?.database.clone())
    }

    /// Get the server host.
    ///
    /// Defaults to "localhost" if not configured.
    pub fn host(&self) -> String {
        self.pick(|c| c.store.as_ref()?.host.clone())
            .unwrap_or_else(|| StoreEndpoint::DEFAULT_HOST.to_string())
    }

    /// Get the server port.
    ///
    /// Defaults to 3306 if not configured.
    pub fn port(&self) -> u16 {
        self.pick(|c| c.store.as_ref()?.port)
            .unwrap_or(StoreEndpoint::DEFAULT_PORT)
    }

    /// Get the user name.
    ///
    /// Defaults to "root" if not configured.
    pub fn user(&self) -> String {
        self.pick(|c| c.store.as_ref()?.user.clone())
            .unwrap_or_else(|| StoreEndpoint::DEFAULT_USER.to_string())
    }

    /// Get the password. The environment wins over files.
    pub fn password(&self) -> String {
        self.password_env
            .clone()
            .or_else(|| self.pick(|c| c.store.as_ref()?.password.clone()))
            .unwrap_or_default()
    }

    /// Get the branch policy.
    ///
    /// Defaults to `create` if not configured.
    pub fn branch_policy(&self) -> BranchPolicy {
        self.pick(|c| c.run.as_ref()?.branch_policy)
            .unwrap_or_default()
    }

    /// Check if the run lock is enabled.
    ///
    /// Defaults to `true` if not configured.
    pub fn lock_enabled(&self) -> bool {
        self.pick(|c| c.run.as_ref()?.lock).unwrap_or(true)
    }

    /// Get the lock directory.
    ///
    /// Defaults to `<cache dir>/doltrun/locks`, or the system temp dir when
    /// no cache dir is known.
    pub fn lock_dir(&self) -> PathBuf {
        self.pick(|c| c.run.as_ref()?.lock_dir.clone())
            .unwrap_or_else(|| {
                dirs::cache_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("doltrun/locks")
            })
    }

    /// Get the message style.
    pub fn message_style(&self) -> MessageStyle {
        self.pick(|c| c.message.as_ref()?.style).unwrap_or_default()
    }

    /// Get the message source label.
    ///
    /// Defaults to "pipeline" if not configured.
    pub fn message_source(&self) -> String {
        self.pick(|c| c.message.as_ref()?.source.clone())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
    }

    /// The commit message builder selected by configuration.
    pub fn message_builder(&self, style: Option<MessageStyle>) -> StyledMessage {
        style
            .unwrap_or_else(|| self.message_style())
            .builder(&self.message_source())
    }

    /// Resolve the store endpoint, applying command-line overrides.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingDatabase`] if no database is configured
    /// - [`ConfigError::InvalidValue`] if an override is invalid
    pub fn endpoint(&self, overrides: &StoreOverrides) -> Result<StoreEndpoint, ConfigError> {
        let database = overrides
            .database
            .clone()
            .or_else(|| self.database())
            .ok_or(ConfigError::MissingDatabase)?;
        let database = DatabaseName::new(database)
            .map_err(|e| ConfigError::InvalidValue(format!("invalid database: {}", e)))?;

        let port = overrides.port.unwrap_or_else(|| self.port());
        if port == 0 {
            return Err(ConfigError::InvalidValue("port cannot be 0".to_string()));
        }

        Ok(StoreEndpoint {
            host: overrides.host.clone().unwrap_or_else(|| self.host()),
            port,
            user: overrides.user.clone().unwrap_or_else(|| self.user()),
            password: self.password(),
            database,
        })
    }
}
