//! Service startup
//!
//! Brings a namespace server up on a kernel: channel, registry entry,
//! mount point and root directory, in that order.

use core_types::{memfs_service_id, NodeId};
use kernel_api::{KernelApi, KernelError};
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::dispatcher::FsServer;
use crate::protocol::FsCodec;
use crate::{FsError, MemFs, MemFsConfig};

/// Errors that stop the service from starting
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Invalid config: {0}")]
    Config(#[from] crate::ConfigError),

    /// Root directory could not be allocated at its well-known id
    #[error("Root allocation failed: {0}")]
    RootAllocation(String),
}

/// Starts the namespace service on `kernel`
///
/// A failed mount leaves the service reachable through the registry only
/// and is not fatal. Failing to allocate the root is.
pub fn bootstrap<K: KernelApi>(
    mut kernel: K,
    config: &MemFsConfig,
) -> Result<FsServer<K>, BootstrapError> {
    config.validate()?;

    let service_id = memfs_service_id();
    let channel = kernel.create_channel()?;
    kernel.register_service(service_id, channel)?;
    info!("memfs registered as {} on {}", service_id, channel);

    match kernel.mount(&config.mount_path, service_id) {
        Ok(()) => info!("memfs mounted at {}", config.mount_path),
        Err(err) => warn!("memfs not mounted at {}: {}", config.mount_path, err),
    }

    let fs = MemFs::new(config);
    let root = fs
        .init_root(config.root_mode)
        .map_err(|err: FsError| BootstrapError::RootAllocation(err.to_string()))?;
    if root != NodeId::ROOT {
        error!("root allocated as {} instead of {}", root, NodeId::ROOT);
        return Err(BootstrapError::RootAllocation(format!(
            "root received {}",
            root
        )));
    }

    Ok(FsServer::new(
        kernel,
        Arc::new(fs),
        FsCodec::new(service_id),
        channel,
    ))
}
