//! # Memory Filesystem Service
//!
//! An in-memory namespace served over kernel channels, suitable as the boot
//! root before persistent storage is up.
//!
//! ## Layers
//!
//! - [`MemFs`]: the operation layer. Nodes, directory entries and file
//!   contents live behind one lock; each operation holds it end to end.
//! - [`protocol`]: request and response messages
//! - [`FsServer`]: drains the service channel and answers every request
//! - [`FsClient`]: the same operations from the other end of a channel
//! - [`bootstrap`](bootstrap::bootstrap): channel, registry, mount, root
//!
//! ## Tree shape
//!
//! - Root is created once with [`core_types::NodeId::ROOT`]; its `..` is itself
//! - A directory is linked at most once, so the namespace stays a tree
//! - A directory holding anything besides `..` cannot be removed
//! - A node is destroyed when its last entry goes away and nobody holds it

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod operations;
pub mod protocol;
pub mod service;

pub use bootstrap::{bootstrap, BootstrapError};
pub use client::{ClientError, FsClient, FsTransport, LoopbackTransport};
pub use config::{ConfigError, MemFsConfig};
pub use dispatcher::{dispatch, FsServer};
pub use error::{FsError, FsErrorKind, FsWireError};
pub use operations::{AttrField, FileSystemOperations, ReadDir, ReaddirCursor};
pub use service::MemFs;
