//! File contents
//!
//! Contents are kept apart from the node records and addressed by node
//! id. The namespace service only ever talks to the [`ContentStore`]
//! trait, so a different backing (paged, copy-on-write) can slot in
//! without touching the operation layer.

use core_types::NodeId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Content storage errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    /// Requested length exceeds the per-file limit
    #[error("File size {requested} exceeds limit of {limit} bytes")]
    TooLarge { requested: u64, limit: u64 },
}

/// Byte contents of file nodes
pub trait ContentStore: Send {
    /// Copies bytes starting at `offset` into `buf`
    ///
    /// Returns the number of bytes copied; zero at or past the end.
    fn read(&self, node: NodeId, offset: u64, buf: &mut [u8]) -> usize;

    /// Writes `data` at `offset`, zero-filling any gap
    ///
    /// Returns the new content length.
    fn write(&mut self, node: NodeId, offset: u64, data: &[u8]) -> Result<u64, ContentError>;

    /// Sets the content length, zero-extending or cutting off the tail
    fn truncate(&mut self, node: NodeId, size: u64) -> Result<(), ContentError>;

    /// Drops all content of a node
    fn release(&mut self, node: NodeId);

    /// Current content length
    fn len(&self, node: NodeId) -> u64;
}

/// Heap-backed content store
#[derive(Debug, Clone)]
pub struct MemoryContent {
    data: BTreeMap<NodeId, Vec<u8>>,
    max_file_size: u64,
}

impl MemoryContent {
    /// Creates a store that refuses files larger than `max_file_size`
    pub fn new(max_file_size: u64) -> Self {
        Self {
            data: BTreeMap::new(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Total bytes held across all files
    pub fn total_bytes(&self) -> u64 {
        self.data.values().map(|bytes| bytes.len() as u64).sum()
    }

    fn check_len(&self, requested: u64) -> Result<usize, ContentError> {
        if requested > self.max_file_size {
            return Err(ContentError::TooLarge {
                requested,
                limit: self.max_file_size,
            });
        }
        usize::try_from(requested).map_err(|_| ContentError::TooLarge {
            requested,
            limit: self.max_file_size,
        })
    }
}

impl ContentStore for MemoryContent {
    fn read(&self, node: NodeId, offset: u64, buf: &mut [u8]) -> usize {
        let Some(bytes) = self.data.get(&node) else {
            return 0;
        };
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= bytes.len() {
            return 0;
        }
        let count = buf.len().min(bytes.len() - start);
        buf[..count].copy_from_slice(&bytes[start..start + count]);
        count
    }

    fn write(&mut self, node: NodeId, offset: u64, data: &[u8]) -> Result<u64, ContentError> {
        if data.is_empty() {
            return Ok(self.len(node));
        }
        let end = offset.saturating_add(data.len() as u64);
        let end_len = self.check_len(end)?;
        let start = end_len - data.len();

        let bytes = self.data.entry(node).or_default();
        if bytes.len() < end_len {
            bytes.resize(end_len, 0);
        }
        bytes[start..end_len].copy_from_slice(data);
        Ok(bytes.len() as u64)
    }

    fn truncate(&mut self, node: NodeId, size: u64) -> Result<(), ContentError> {
        let size = self.check_len(size)?;
        if size == 0 {
            self.data.remove(&node);
        } else {
            self.data.entry(node).or_default().resize(size, 0);
        }
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        self.data.remove(&node);
    }

    fn len(&self, node: NodeId) -> u64 {
        self.data.get(&node).map_or(0, |bytes| bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32) -> NodeId {
        NodeId::new(index, 0)
    }

    #[test]
    fn test_write_then_read() {
        let mut store = MemoryContent::new(1024);
        assert_eq!(store.write(node(1), 0, b"hello").unwrap(), 5);

        let mut buf = [0u8; 16];
        let n = store.read(node(1), 0, &mut buf);
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut store = MemoryContent::new(1024);
        assert_eq!(store.write(node(1), 4, b"ab").unwrap(), 6);

        let mut buf = [0xffu8; 6];
        assert_eq!(store.read(node(1), 0, &mut buf), 6);
        assert_eq!(buf, [0, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn test_empty_write_keeps_length() {
        let mut store = MemoryContent::new(1024);
        store.write(node(1), 0, b"abc").unwrap();
        assert_eq!(store.write(node(1), 100, b"").unwrap(), 3);
        assert_eq!(store.write(node(2), 100, b"").unwrap(), 0);
        assert_eq!(store.total_bytes(), 3);
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let mut store = MemoryContent::new(1024);
        store.write(node(1), 0, b"abc").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(store.read(node(1), 3, &mut buf), 0);
        assert_eq!(store.read(node(1), 100, &mut buf), 0);
        assert_eq!(store.read(node(2), 0, &mut buf), 0);
    }

    #[test]
    fn test_size_limit() {
        let mut store = MemoryContent::new(4);
        assert_eq!(
            store.write(node(1), 2, b"abc"),
            Err(ContentError::TooLarge {
                requested: 5,
                limit: 4
            })
        );
        assert_eq!(store.len(node(1)), 0);
        assert!(store.truncate(node(1), 5).is_err());
    }

    #[test]
    fn test_truncate_and_release() {
        let mut store = MemoryContent::new(1024);
        store.write(node(1), 0, b"abcdef").unwrap();
        store.truncate(node(1), 2).unwrap();
        assert_eq!(store.len(node(1)), 2);

        store.truncate(node(1), 4).unwrap();
        let mut buf = [0xffu8; 4];
        store.read(node(1), 0, &mut buf);
        assert_eq!(buf, [b'a', b'b', 0, 0]);

        store.release(node(1));
        assert_eq!(store.len(node(1)), 0);
        assert_eq!(store.total_bytes(), 0);
    }
}
