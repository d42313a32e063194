//! Configuration file handling for ~/.sencast/config.ini.
//!
//! Settings structs live in [`super::settings`], constants in [`super::defaults`]
//! and parsing in [`super::parser`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::HindcastConfig;
use crate::aoi::AoiError;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    Read(#[from] ini::Error),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A required key is absent or empty
    #[error("Missing configuration key: [{section}] {key}")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid area of interest: {0}")]
    Aoi(#[from] AoiError),

    #[error("Unknown processor '{0}'")]
    UnknownProcessor(String),

    #[error("Unknown adapter '{0}'")]
    UnknownAdapter(String),

    #[error("Unknown download provider '{0}'")]
    UnknownProvider(String),
}

impl HindcastConfig {
    /// Load configuration from the default path (~/.sencast/config.ini).
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Relative paths inside the file (`wkt_file`) resolve against the
    /// directory holding it.
    pub fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.to_path_buf()));
        }

        let ini = Ini::load_from_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        super::parser::parse_ini(&ini, base_dir)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str, base_dir: &Path) -> Result<Self, ConfigurationError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini, base_dir)
    }
}

/// Get the path to the config directory (~/.sencast).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sencast")
}

/// Get the path to the config file (~/.sencast/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
