//! Kernel API trait

use crate::KernelError;
use core_types::ServiceId;
use ipc::{ChannelId, MessageEnvelope};

/// The kernel API trait
///
/// Multiple implementations are possible:
/// - Simulated kernel (for testing and the host daemon)
/// - Real kernel (syscalls)
///
/// # Example
///
/// ```
/// use core_types::ServiceId;
/// use kernel_api::{KernelApi, KernelError};
///
/// fn announce<K: KernelApi>(kernel: &mut K, service: ServiceId) -> Result<(), KernelError> {
///     let channel = kernel.create_channel()?;
///     kernel.register_service(service, channel)?;
///     kernel.mount("/", service)
/// }
/// ```
pub trait KernelApi {
    /// Creates a new communication channel
    fn create_channel(&mut self) -> Result<ChannelId, KernelError>;

    /// Sends a message through a channel
    ///
    /// This is non-blocking. If the channel is full, it returns an error.
    fn send_message(
        &mut self,
        channel: ChannelId,
        message: MessageEnvelope,
    ) -> Result<(), KernelError>;

    /// Receives the next message from a channel
    ///
    /// Returns [`KernelError::WouldBlock`] when nothing is queued.
    fn receive_message(&mut self, channel: ChannelId) -> Result<MessageEnvelope, KernelError>;

    /// Registers a service by ID
    fn register_service(
        &mut self,
        service_id: ServiceId,
        channel: ChannelId,
    ) -> Result<(), KernelError>;

    /// Looks up the channel of a registered service
    fn lookup_service(&self, service_id: ServiceId) -> Result<ChannelId, KernelError>;

    /// Attaches a registered service at a path prefix
    ///
    /// Mounting at `/` makes the service the boot root.
    fn mount(&mut self, path: &str, service_id: ServiceId) -> Result<(), KernelError>;

    /// Returns the service mounted at the longest prefix of `path`
    fn resolve_mount(&self, path: &str) -> Result<ServiceId, KernelError>;
}
