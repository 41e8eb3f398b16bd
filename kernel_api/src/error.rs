//! Kernel error types

use thiserror::Error;

/// Errors that can occur when interacting with the kernel
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Channel operation failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Message send failed
    #[error("Failed to send message: {0}")]
    SendFailed(String),

    /// Message receive failed
    #[error("Failed to receive message: {0}")]
    ReceiveFailed(String),

    /// No message is queued on a non-blocking receive
    #[error("No message pending")]
    WouldBlock,

    /// Service not found
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Service already registered
    #[error("Service already registered: {0}")]
    ServiceAlreadyRegistered(String),

    /// Mount point already taken
    #[error("Mount point busy: {0}")]
    MountPointBusy(String),

    /// Resource exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}
