//! Node table
//!
//! An arena of node slots addressed by generation-checked ids. Every
//! access goes through a [`NodeGuard`], the scoped form of a live
//! reference: acquiring one increments the node's reference count and
//! dropping it decrements the count again, so a get can never be left
//! without its put.

use core_types::{NodeId, NodeKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::Node;

/// Node table errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// No free slot left
    #[error("Node table exhausted ({capacity} nodes)")]
    Exhausted { capacity: usize },

    /// The id no longer names a live node
    #[error("{0} has been destroyed")]
    Destroyed(NodeId),

    /// Other live references are outstanding
    #[error("{id} still has {refs} live references")]
    InUse { id: NodeId, refs: usize },

    /// Directory still has entries beyond `..`
    #[error("{0} is a non-empty directory")]
    NotEmpty(NodeId),
}

enum Slot {
    Live { node: Node, refs: Arc<AtomicUsize> },
    Destroyed { generation: u32 },
}

/// A live reference to a node
///
/// Not `Clone`: each guard is exactly one reference. Destroying a node
/// consumes the guard that proves the caller held it.
#[derive(Debug)]
pub struct NodeGuard {
    id: NodeId,
    refs: Arc<AtomicUsize>,
}

impl NodeGuard {
    /// Id of the referenced node
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        self.refs.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Table of live nodes
pub struct NodeTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl NodeTable {
    /// Creates a table holding at most `capacity` live nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
        }
    }

    /// Allocates an unlinked node
    ///
    /// The first allocation of a fresh table always receives
    /// [`NodeId::ROOT`].
    pub fn create(&mut self, kind: NodeKind, mode: u32) -> Result<NodeId, TableError> {
        if self.live >= self.capacity {
            return Err(TableError::Exhausted {
                capacity: self.capacity,
            });
        }

        let id = match self.free.pop() {
            Some(index) => {
                let generation = match self.slots.get(index as usize) {
                    Some(Slot::Destroyed { generation }) => generation.wrapping_add(1),
                    _ => 0,
                };
                NodeId::new(index, generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    TableError::Exhausted {
                        capacity: self.capacity,
                    }
                })?;
                self.slots.push(Slot::Destroyed { generation: 0 });
                NodeId::new(index, 0)
            }
        };

        self.slots[id.index() as usize] = Slot::Live {
            node: Node::new(id, kind, mode),
            refs: Arc::new(AtomicUsize::new(0)),
        };
        self.live += 1;
        Ok(id)
    }

    /// Takes a live reference to a node
    ///
    /// Returns `None` if the id is unknown or the node was destroyed.
    pub fn acquire(&self, id: NodeId) -> Option<NodeGuard> {
        match self.slots.get(id.index() as usize)? {
            Slot::Live { node, refs } if node.id() == id => {
                refs.fetch_add(1, Ordering::AcqRel);
                Some(NodeGuard {
                    id,
                    refs: Arc::clone(refs),
                })
            }
            _ => None,
        }
    }

    /// Borrows the node a guard refers to
    pub fn node(&self, guard: &NodeGuard) -> Result<&Node, TableError> {
        match self.slots.get(guard.id.index() as usize) {
            Some(Slot::Live { node, .. }) if node.id() == guard.id => Ok(node),
            _ => Err(TableError::Destroyed(guard.id)),
        }
    }

    /// Mutably borrows the node a guard refers to
    pub fn node_mut(&mut self, guard: &NodeGuard) -> Result<&mut Node, TableError> {
        match self.slots.get_mut(guard.id.index() as usize) {
            Some(Slot::Live { node, .. }) if node.id() == guard.id => Ok(node),
            _ => Err(TableError::Destroyed(guard.id)),
        }
    }

    /// Retires a node, consuming the caller's reference
    ///
    /// Fails while anyone else holds a reference or while a directory
    /// still has entries beyond `..`. On failure the guard is dropped and
    /// the node stays live.
    pub fn destroy(&mut self, guard: NodeGuard) -> Result<Node, TableError> {
        let id = guard.id;
        let index = id.index() as usize;
        match self.slots.get(index) {
            Some(Slot::Live { node, refs }) if node.id() == id => {
                let held = refs.load(Ordering::Acquire);
                if held > 1 {
                    return Err(TableError::InUse {
                        id,
                        refs: held - 1,
                    });
                }
                if !node.is_empty_dir() {
                    return Err(TableError::NotEmpty(id));
                }
            }
            _ => return Err(TableError::Destroyed(id)),
        }

        let retired = std::mem::replace(
            &mut self.slots[index],
            Slot::Destroyed {
                generation: id.generation(),
            },
        );
        drop(guard);
        self.free.push(id.index());
        self.live -= 1;

        match retired {
            Slot::Live { node, .. } => Ok(node),
            Slot::Destroyed { .. } => Err(TableError::Destroyed(id)),
        }
    }

    /// Number of live references currently held on a node
    pub fn ref_count(&self, id: NodeId) -> Option<usize> {
        match self.slots.get(id.index() as usize)? {
            Slot::Live { node, refs } if node.id() == id => Some(refs.load(Ordering::Acquire)),
            _ => None,
        }
    }

    /// Whether the id names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.ref_count(id).is_some()
    }

    /// Number of live nodes
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Maximum number of live nodes
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_allocation_is_root() {
        let mut table = NodeTable::with_capacity(4);
        let id = table.create(NodeKind::Directory, 0).unwrap();
        assert_eq!(id, NodeId::ROOT);
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn test_guard_pairs_acquire_and_release() {
        let mut table = NodeTable::with_capacity(4);
        let id = table.create(NodeKind::File, 0o644).unwrap();
        assert_eq!(table.ref_count(id), Some(0));

        {
            let first = table.acquire(id).unwrap();
            let second = table.acquire(id).unwrap();
            assert_eq!(table.ref_count(id), Some(2));
            assert_eq!(table.node(&first).unwrap().mode, 0o644);
            drop(second);
            assert_eq!(table.ref_count(id), Some(1));
        }

        assert_eq!(table.ref_count(id), Some(0));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut table = NodeTable::with_capacity(1);
        table.create(NodeKind::File, 0).unwrap();
        assert_eq!(
            table.create(NodeKind::File, 0),
            Err(TableError::Exhausted { capacity: 1 })
        );
    }

    #[test]
    fn test_destroy_retires_id() {
        let mut table = NodeTable::with_capacity(4);
        let id = table.create(NodeKind::File, 0).unwrap();
        let guard = table.acquire(id).unwrap();

        let node = table.destroy(guard).unwrap();
        assert_eq!(node.id(), id);
        assert!(!table.contains(id));
        assert!(table.acquire(id).is_none());
        assert_eq!(table.live_count(), 0);
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut table = NodeTable::with_capacity(4);
        let old = table.create(NodeKind::File, 0).unwrap();
        let guard = table.acquire(old).unwrap();
        table.destroy(guard).unwrap();

        let new = table.create(NodeKind::File, 0).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(table.acquire(old).is_none());
        assert!(table.acquire(new).is_some());
    }

    #[test]
    fn test_destroy_refused_while_referenced() {
        let mut table = NodeTable::with_capacity(4);
        let id = table.create(NodeKind::File, 0).unwrap();
        let other = table.acquire(id).unwrap();
        let guard = table.acquire(id).unwrap();

        assert_eq!(
            table.destroy(guard).unwrap_err(),
            TableError::InUse { id, refs: 1 }
        );
        assert!(table.contains(id));
        assert_eq!(table.ref_count(id), Some(1));
        drop(other);
    }

    #[test]
    fn test_destroy_refused_for_populated_directory() {
        let mut table = NodeTable::with_capacity(4);
        let dir = table.create(NodeKind::Directory, 0).unwrap();
        let child = table.create(NodeKind::File, 0).unwrap();

        let guard = table.acquire(dir).unwrap();
        let entries = table.node_mut(&guard).unwrap().entries_mut().unwrap();
        entries.insert("..", NodeId::ROOT).unwrap();
        entries.insert("child", child).unwrap();

        assert_eq!(table.destroy(guard).unwrap_err(), TableError::NotEmpty(dir));

        let guard = table.acquire(dir).unwrap();
        table
            .node_mut(&guard)
            .unwrap()
            .entries_mut()
            .unwrap()
            .remove("child");
        assert!(table.destroy(guard).is_ok());
    }
}
