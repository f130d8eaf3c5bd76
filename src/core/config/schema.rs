//! core::config::schema
//!
//! Configuration schema types.
//!
//! The same schema is used for the global file and the project file; every
//! field is optional so a file only needs the values it overrides.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the database must be a valid database name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::message::MessageStyle;
use crate::core::types::{BranchPolicy, DatabaseName};

/// One configuration file.
///
/// # Example
///
/// ```toml
/// [store]
/// database = "analytics"
/// host = "dolt.internal"
/// port = 3306
/// user = "pipeline"
///
/// [run]
/// branch_policy = "require"
/// lock = true
///
/// [message]
/// style = "extra-params"
/// source = "kedro"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Versioned store connection
    pub store: Option<StoreSection>,

    /// Run lifecycle settings
    pub run: Option<RunSection>,

    /// Commit message settings
    pub message: Option<MessageSection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            store.validate()?;
        }
        if let Some(message) = &self.message {
            message.validate()?;
        }
        if let Some(run) = &self.run {
            run.validate()?;
        }
        Ok(())
    }

    /// Whether this file stores a password.
    pub fn has_password(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(|s| s.password.as_ref().is_some_and(|p| !p.is_empty()))
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Database name (required somewhere: file, env or flag)
    pub database: Option<String>,

    /// Server host (default: "localhost")
    pub host: Option<String>,

    /// Server port (default: 3306)
    pub port: Option<u16>,

    /// User name (default: "root")
    pub user: Option<String>,

    /// Password (default: empty; `DOLTRUN_PASSWORD` overrides)
    pub password: Option<String>,
}

impl StoreSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(database) = &self.database {
            DatabaseName::new(database.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid store.database: {}", e))
            })?;
        }

        if let Some(host) = &self.host {
            if host.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "store.host cannot be empty".to_string(),
                ));
            }
        }

        if self.port == Some(0) {
            return Err(ConfigError::InvalidValue(
                "store.port cannot be 0".to_string(),
            ));
        }

        if let Some(user) = &self.user {
            if user.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "store.user cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// What to do when the requested branch is missing (default: create)
    pub branch_policy: Option<BranchPolicy>,

    /// Whether to take the host-local run lock (default: true)
    pub lock: Option<bool>,

    /// Directory for lock files (default: `<cache dir>/doltrun/locks`)
    pub lock_dir: Option<PathBuf>,
}

impl RunSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.lock_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "run.lock_dir cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// `[message]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MessageSection {
    /// Message style (default: "default")
    pub style: Option<MessageStyle>,

    /// Source label in `Update from <source> run: <id>` (default: "pipeline")
    pub source: Option<String>,
}

impl MessageSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(source) = &self.source {
            if source.trim().is_empty() || source.contains('\n') {
                return Err(ConfigError::InvalidValue(
                    "message.source must be a non-empty single line".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_parses() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_file_parses() {
        let config: FileConfig = toml::from_str(
            r#"
            [store]
            database = "analytics"
            host = "dolt.internal"
            port = 3307
            user = "pipeline"

            [run]
            branch_policy = "require"
            lock = false
            lock_dir = "/tmp/locks"

            [message]
            style = "extra-params"
            source = "kedro"
            "#,
        )
        .unwrap();

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.database.as_deref(), Some("analytics"));
        assert_eq!(store.port, Some(3307));
        let run = config.run.as_ref().unwrap();
        assert_eq!(run.branch_policy, Some(BranchPolicy::Require));
        assert_eq!(run.lock, Some(false));
        let message = config.message.as_ref().unwrap();
        assert_eq!(message.style, Some(MessageStyle::ExtraParams));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[store]\ndatabse = \"typo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_policy_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[run]\nbranch_policy = \"auto\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_values() {
        let bad_db = FileConfig {
            store: Some(StoreSection {
                database: Some("has space".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(bad_db.validate().is_err());

        let bad_port = FileConfig {
            store: Some(StoreSection {
                port: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(bad_port.validate().is_err());

        let bad_source = FileConfig {
            message: Some(MessageSection {
                source: Some(" ".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(bad_source.validate().is_err());
    }

    #[test]
    fn has_password() {
        let mut config = FileConfig::default();
        assert!(!config.has_password());
        config.store = Some(StoreSection {
            password: Some("secret".into()),
            ..Default::default()
        });
        assert!(config.has_password());
    }
}
