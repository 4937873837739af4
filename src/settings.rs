//! Runtime settings: built-in defaults, then an optional YAML file named by `PDQ_CONFIG`, then
//! individual `PDQ_*` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::DEFAULT_OUTPUT_DIR;
use crate::data::DEFAULT_DATA_DIR;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

pub const ENV_CONFIG: &str = "PDQ_CONFIG";
pub const ENV_BIND: &str = "PDQ_BIND";
pub const ENV_DATA_DIR: &str = "PDQ_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "PDQ_OUTPUT_DIR";
pub const ENV_REPAIR_FROM_BACKUP: &str = "PDQ_REPAIR_FROM_BACKUP";
pub const ENV_LOG_FORMAT: &str = "PDQ_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Default,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<LogFormat> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "text" | "" => Some(LogFormat::Default),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub repair_from_backup: bool,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: DEFAULT_BIND.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            repair_from_backup: true,
            log_format: LogFormat::Default,
        }
    }
}

impl Settings {
    /// Settings for this process, honouring `PDQ_CONFIG` and the individual overrides.
    pub fn from_env() -> Result<Settings, SettingsError> {
        let base = match env::var_os(ENV_CONFIG) {
            Some(path) if !path.is_empty() => Settings::from_file(Path::new(&path))?,
            _ => Settings::default(),
        };
        base.apply_overrides(|key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Settings, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, SettingsError> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_REPAIR_FROM_BACKUP) {
            self.repair_from_backup = parse_bool(&raw).ok_or(SettingsError::InvalidValue {
                key: ENV_REPAIR_FROM_BACKUP,
                value: raw,
            })?;
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            self.log_format = LogFormat::parse(&raw).ok_or(SettingsError::InvalidValue {
                key: ENV_LOG_FORMAT,
                value: raw,
            })?;
        }
        Ok(self)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
