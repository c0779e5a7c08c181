//! Locating and reading `verse-watch` TOML files.

use std::path::{Path, PathBuf};

use crate::pipeline::{Pipeline, PipelineError};
use crate::recognizer::{OverrideError, PatternSetError};

use super::WatchConfig;

const LOCAL_FILE: &str = ".verse-watch.toml";

/// Finds the config file and turns it into a validated [`WatchConfig`].
#[derive(Debug)]
pub struct ConfigLoader {
    candidates: Vec<PathBuf>,
    /// A file named on the command line must exist.
    required: bool,
}

impl ConfigLoader {
    /// Look in the working directory, then the per-user config dir.
    #[must_use]
    pub fn new() -> Self {
        let mut candidates = vec![PathBuf::from(LOCAL_FILE)];
        if let Some(base) = dirs::config_dir() {
            candidates.push(base.join("verse-watch").join("config.toml"));
        }
        Self {
            candidates,
            required: false,
        }
    }

    /// Use exactly `path`.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            candidates: vec![path],
            required: true,
        }
    }

    /// Read the first candidate that exists. Without one, defaults apply
    /// unless the file was named explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, is not valid
    /// TOML for [`WatchConfig`], holds a custom pattern that does not
    /// compile, or overrides a built-in pattern badly.
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        if let Some(found) = self.find_config_file() {
            tracing::debug!(path = %found.display(), "Reading config");
            return Self::load_from_path(&found);
        }
        match self.candidates.first() {
            Some(path) if self.required => Err(ConfigError::ReadError {
                path: path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            _ => {
                tracing::debug!(searched = self.candidates.len(), "No config file, using defaults");
                Ok(WatchConfig::default())
            }
        }
    }

    /// Parse one file and build a pipeline from it once so a bad pattern
    /// is reported at startup rather than when the watcher starts.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load_from_path(path: &Path) -> Result<WatchConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WatchConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        Pipeline::new(&config).map_err(|e| match e {
            PipelineError::Custom(source) => ConfigError::InvalidPattern {
                path: path.to_path_buf(),
                source,
            },
            PipelineError::Override(source) => ConfigError::InvalidOverride {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(config)
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.candidates
    }

    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.candidates.iter().find(|p| p.is_file()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Bad config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid custom pattern in {path}: {source}")]
    InvalidPattern {
        path: PathBuf,
        source: PatternSetError,
    },

    #[error("Invalid pattern override in {path}: {source}")]
    InvalidOverride {
        path: PathBuf,
        source: OverrideError,
    },
}
