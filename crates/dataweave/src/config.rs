//! Library configuration and TOML loading.
//!
//! ```toml
//! [units]
//! sanitize = true
//!
//! [file]
//! format = "nix"
//! validate_on_close = false
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use dataweave_core::error::Error;

/// Format tag written into new files unless configured otherwise.
pub const DEFAULT_FORMAT: &str = "nix";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::invalid_file_with("invalid configuration", err)
    }
}

/// Configuration of files created or opened by this library.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Unit handling section
    #[serde(default)]
    units: UnitsConfig,

    /// File format section
    #[serde(default)]
    file: FileConfig,
}

impl Config {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFile`] for malformed TOML or invalid settings.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn units(&self) -> &UnitsConfig {
        &self.units
    }

    pub fn file(&self) -> &FileConfig {
        &self.file
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.file.format.is_empty() {
            return Err(ConfigError::Validation(
                "file.format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unit handling section
#[derive(Debug, Clone, Deserialize)]
pub struct UnitsConfig {
    /// Normalise unit spelling before validating it
    #[serde(default = "default_sanitize")]
    sanitize: bool,
}

impl UnitsConfig {
    pub fn sanitize(&self) -> bool {
        self.sanitize
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            sanitize: default_sanitize(),
        }
    }
}

fn default_sanitize() -> bool {
    true
}

/// File format section
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// Format tag written on create and required on open
    #[serde(default = "default_format")]
    format: String,

    /// Run the validator when a file is closed and log its findings
    #[serde(default)]
    validate_on_close: bool,
}

impl FileConfig {
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn validate_on_close(&self) -> bool {
        self.validate_on_close
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            validate_on_close: false,
        }
    }
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Loads configuration from a TOML file.
///
/// # Errors
///
/// Returns [`Error::InvalidFile`] if the file is missing, unreadable, or not
/// valid configuration.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let path = path.as_ref();
    info!(path = path.display().to_string(); "Loading configuration");

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path).map_err(ConfigError::from)?;
    let config = Config::from_toml_str(&content)?;
    debug!(format = config.file().format(); "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use dataweave_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.units().sanitize());
        assert_eq!(config.file().format(), "nix");
        assert!(!config.file().validate_on_close());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = Config::from_toml_str("[file]\nvalidate_on_close = true\n").unwrap();
        assert!(config.file().validate_on_close());
        assert_eq!(config.file().format(), "nix");
        assert!(config.units().sanitize());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[units\nsanitize = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_empty_format_rejected() {
        let err = Config::from_toml_str("[file]\nformat = \"\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }
}
