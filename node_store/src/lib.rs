//! # Node Store
//!
//! Storage collaborators of the namespace service.
//!
//! - [`NodeTable`]: allocates and retires nodes and tracks the live
//!   references handed out for each one
//! - [`ContentStore`]: byte contents of file nodes, keyed by node id
//!
//! Neither type does any locking. The namespace service keeps both behind
//! its single coordination lock.

pub mod content;
pub mod node;
pub mod table;

pub use content::{ContentError, ContentStore, MemoryContent};
pub use node::Node;
pub use table::{NodeGuard, NodeTable, TableError};
