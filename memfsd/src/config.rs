//! Config file loading

use services_memfs::{ConfigError, MemFsConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading the daemon config file
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Reads a JSON config file; omitted fields keep their defaults
pub fn load_config_file(path: &Path) -> Result<MemFsConfig, ConfigFileError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    MemFsConfig::from_json(&text).map_err(|source| ConfigFileError::Config {
        path: path.to_path_buf(),
        source,
    })
}
