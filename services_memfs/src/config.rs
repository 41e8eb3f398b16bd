//! Service configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Namespace service configuration
///
/// Every field has a default, so a JSON document only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemFsConfig {
    /// Path prefix the service is mounted at
    pub mount_path: String,
    /// Maximum number of live nodes, root included
    ///
    /// Zero leaves no room for the root and fails bootstrap.
    pub max_nodes: usize,
    /// Longest accepted entry name in bytes
    pub max_name_len: usize,
    /// Largest file content in bytes
    pub max_file_size: u64,
    /// Permission bits of the root directory
    pub root_mode: u32,
    /// Depth of the request channel
    pub queue_capacity: usize,
}

impl Default for MemFsConfig {
    fn default() -> Self {
        Self {
            mount_path: "/".to_string(),
            max_nodes: 4096,
            max_name_len: 255,
            max_file_size: 16 * 1024 * 1024,
            root_mode: 0o755,
            queue_capacity: 64,
        }
    }
}

impl MemFsConfig {
    /// Parses and validates a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mount_path(mut self, path: impl Into<String>) -> Self {
        self.mount_path = path.into();
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_root_mode(mut self, mode: u32) -> Self {
        self.root_mode = mode;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Rejects values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mount_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "mount_path",
                reason: format!("{} is not absolute", self.mount_path),
            });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid {
                field: "max_name_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "queue_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
