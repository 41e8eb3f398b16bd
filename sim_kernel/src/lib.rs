//! # Simulated Kernel
//!
//! An in-process implementation of the kernel API.
//!
//! The simulated kernel lets the namespace service run without hardware:
//! - Runs under `cargo test` and inside the host daemon
//! - Deterministic (no real concurrency, FIFO channels)
//! - Inspectable (all state is accessible)

use core_types::ServiceId;
use ipc::{ChannelId, MessageEnvelope};
use kernel_api::{KernelApi, KernelError};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Default per-channel queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Bounded FIFO behind one channel
struct ChannelQueue {
    capacity: usize,
    messages: VecDeque<MessageEnvelope>,
}

impl ChannelQueue {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.messages.len()
    }

    /// Hands the message back when the queue is full
    fn push(&mut self, message: MessageEnvelope) -> Result<(), MessageEnvelope> {
        if self.messages.len() >= self.capacity {
            return Err(message);
        }
        self.messages.push_back(message);
        Ok(())
    }

    fn pop(&mut self) -> Option<MessageEnvelope> {
        self.messages.pop_front()
    }
}

/// Simulated kernel state
pub struct SimulatedKernel {
    /// Message channels
    channels: HashMap<ChannelId, ChannelQueue>,
    /// Service registry
    services: HashMap<ServiceId, ChannelId>,
    /// Mount table: normalized path prefix -> service
    mounts: BTreeMap<String, ServiceId>,
    /// Depth of every newly created channel
    queue_capacity: usize,
}

impl SimulatedKernel {
    /// Creates a new simulated kernel
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a kernel whose channels hold at most `capacity` messages
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            channels: HashMap::new(),
            services: HashMap::new(),
            mounts: BTreeMap::new(),
            queue_capacity: capacity,
        }
    }

    /// Returns the number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of registered services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Returns the number of messages waiting on a channel
    pub fn pending_on(&self, channel: ChannelId) -> usize {
        self.channels.get(&channel).map_or(0, ChannelQueue::len)
    }

    /// Returns the total number of queued messages
    pub fn pending_message_count(&self) -> usize {
        self.channels.values().map(ChannelQueue::len).sum()
    }

    /// Returns the mount table
    pub fn mounts(&self) -> impl Iterator<Item = (&str, ServiceId)> {
        self.mounts.iter().map(|(path, id)| (path.as_str(), *id))
    }
}

impl Default for SimulatedKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl KernelApi for SimulatedKernel {
    fn create_channel(&mut self) -> Result<ChannelId, KernelError> {
        let channel_id = ChannelId::new();
        self.channels
            .insert(channel_id, ChannelQueue::with_capacity(self.queue_capacity));
        Ok(channel_id)
    }

    fn send_message(
        &mut self,
        channel: ChannelId,
        message: MessageEnvelope,
    ) -> Result<(), KernelError> {
        let queue = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| KernelError::ChannelError("Channel not found".to_string()))?;
        queue.push(message).map_err(|rejected| {
            KernelError::ResourceExhausted(format!(
                "{} queue is full, dropped {}",
                channel, rejected.id
            ))
        })
    }

    fn receive_message(&mut self, channel: ChannelId) -> Result<MessageEnvelope, KernelError> {
        let queue = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| KernelError::ChannelError("Channel not found".to_string()))?;
        queue.pop().ok_or(KernelError::WouldBlock)
    }

    fn register_service(
        &mut self,
        service_id: ServiceId,
        channel: ChannelId,
    ) -> Result<(), KernelError> {
        if self.services.contains_key(&service_id) {
            return Err(KernelError::ServiceAlreadyRegistered(
                service_id.to_string(),
            ));
        }
        if !self.channels.contains_key(&channel) {
            return Err(KernelError::ChannelError("Channel not found".to_string()));
        }
        self.services.insert(service_id, channel);
        Ok(())
    }

    fn lookup_service(&self, service_id: ServiceId) -> Result<ChannelId, KernelError> {
        self.services
            .get(&service_id)
            .copied()
            .ok_or_else(|| KernelError::ServiceNotFound(service_id.to_string()))
    }

    fn mount(&mut self, path: &str, service_id: ServiceId) -> Result<(), KernelError> {
        if !self.services.contains_key(&service_id) {
            return Err(KernelError::ServiceNotFound(service_id.to_string()));
        }
        let path = normalize_mount_path(path);
        if self.mounts.contains_key(&path) {
            return Err(KernelError::MountPointBusy(path));
        }
        self.mounts.insert(path, service_id);
        Ok(())
    }

    fn resolve_mount(&self, path: &str) -> Result<ServiceId, KernelError> {
        let path = normalize_mount_path(path);
        self.mounts
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, &path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, id)| *id)
            .ok_or(KernelError::ServiceNotFound(path))
    }
}
