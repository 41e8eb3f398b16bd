//! Namespace node identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a filesystem node
///
/// A slot index paired with the generation of the slot when the node was
/// allocated. Once a node is destroyed its slot generation moves on, so a
/// stale id never resolves to whatever reuses the slot.
///
/// Holding a `NodeId` does not keep the node alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Well-known id of the root directory (first allocation of a fresh table)
    pub const ROOT: NodeId = NodeId::new(0, 0);

    /// Creates an id from its parts
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Packs the id into the 64-bit form used by directory records
    pub const fn as_u64(&self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Inverse of [`NodeId::as_u64`]
    pub const fn from_u64(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }

    /// Whether this is the root id
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}v{})", self.index, self.generation)
    }
}

/// Kind of a filesystem node, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file backed by content storage
    File,
    /// Directory owning an entry list
    Directory,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "File"),
            NodeKind::Directory => write!(f, "Directory"),
        }
    }
}
