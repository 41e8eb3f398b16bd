//! # Core Types
//!
//! This crate defines the fundamental identifiers shared by the memfs
//! workspace.
//!
//! ## Key Types
//!
//! - [`ServiceId`]: Unique identifier for services
//! - [`NodeId`], [`NodeKind`]: Namespace node identity and kind
//! - [`memfs_service_id`]: Stable identifier of the namespace service

pub mod ids;
pub mod node;
pub mod service_ids;
pub mod uuid_tools;

pub use ids::ServiceId;
pub use node::{NodeId, NodeKind};
pub use service_ids::memfs_service_id;
pub use uuid_tools::new_uuid;
