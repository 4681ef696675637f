use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::CopyGroups;

/// Settings file errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

/// Engine settings, read from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Catalog store file
    pub store_path: PathBuf,

    /// Log filter in `tracing` directive syntax, `RUST_LOG` wins when set
    pub log_filter: String,

    /// Wall-clock limit for one save flow (assign, bulk assign, copy)
    pub save_timeout_secs: u64,

    /// Groups a multi-year copy includes unless told otherwise
    pub copy_defaults: CopyGroups,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_path: default_data_dir().join("catalog.json"),
            log_filter: "motoctl=info,motoctl_lib=info".to_string(),
            save_timeout_secs: 30,
            copy_defaults: CopyGroups::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("motoctl")
}

impl EngineSettings {
    /// Default location of the settings file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motoctl")
            .join("settings.toml")
    }

    /// Load settings from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Self = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.save_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                field: "save_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "log_filter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !self.copy_defaults.any() {
            return Err(SettingsError::Invalid {
                field: "copy_defaults".to_string(),
                reason: "enable at least one group".to_string(),
            });
        }
        Ok(())
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }
}
