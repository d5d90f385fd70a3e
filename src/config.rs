//! Daemon configuration.
//!
//! Settings live in a TOML file:
//!
//! ```toml
//! library = "/data/media/tv"
//! watch = ["/data/media/seedbox", "/data/media/expanded"]
//! log_level = "debug"
//!
//! [aliases]
//! timeless = "timeless 2016"
//! ```
//!
//! Only `library` and `watch` are required.

use crate::series::SeriesNameParser;
use crate::watcher::handler::{DEFAULT_CANONICAL_EXTENSION, DEFAULT_MEDIA_EXTENSIONS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Overrides the default config file location.
pub const CONFIG_ENV: &str = "LIBRARY_ORGANIZER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),

    #[error("no watch directories configured")]
    NoWatchRoots,

    #[error("canonical extension {0:?} is not one of the media extensions")]
    CanonicalNotMedia(String),

    #[error("no configuration directory could be determined")]
    NoConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub library: PathBuf,

    pub watch: Vec<PathBuf>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,

    #[serde(default = "default_canonical_extension")]
    pub canonical_extension: String,

    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

fn default_media_extensions() -> Vec<String> {
    DEFAULT_MEDIA_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

fn default_canonical_extension() -> String {
    DEFAULT_CANONICAL_EXTENSION.to_owned()
}

impl Config {
    /// Builds a config with defaults for everything but the two paths.
    pub fn new(library: impl Into<PathBuf>, watch: Vec<PathBuf>) -> Self {
        Config {
            library: library.into(),
            watch,
            log_level: None,
            media_extensions: default_media_extensions(),
            canonical_extension: default_canonical_extension(),
            aliases: BTreeMap::new(),
        }
    }

    /// Reads and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// `$LIBRARY_ORGANIZER_CONFIG`, or `library-organizer/config.toml` under
    /// the user's config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("library-organizer").join("config.toml"))
            .ok_or(ConfigError::NoConfig)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.is_empty() {
            return Err(ConfigError::NoWatchRoots);
        }
        // an episode folder payload must itself be a linkable file
        if !self.media_extensions.contains(&self.canonical_extension) {
            return Err(ConfigError::CanonicalNotMedia(
                self.canonical_extension.clone(),
            ));
        }
        self.log_level()?;
        Ok(())
    }

    /// Minimum severity for the log sink, if one was configured.
    pub fn log_level(&self) -> Result<Option<Level>, ConfigError> {
        self.log_level
            .as_deref()
            .map(|raw| Level::from_str(raw).map_err(|_| ConfigError::InvalidLogLevel(raw.to_owned())))
            .transpose()
    }

    pub fn parser(&self) -> SeriesNameParser {
        SeriesNameParser::with_aliases(self.aliases.clone())
    }
}
