//! # Inter-Process Communication (IPC)
//!
//! Message-passing primitives used between the namespace service and its
//! clients.
//!
//! Messages are the fundamental unit of communication. They contain:
//! - Routing information (destination)
//! - Action/method to invoke
//! - Schema version for backward compatibility
//! - Correlation ID for request/response matching
//! - Serialized payload

pub mod channel;
pub mod message;

pub use channel::ChannelId;
pub use message::{MessageEnvelope, MessageId, MessagePayload, SchemaVersion};
