//! Directory entry list
//!
//! A directory owns an ordered sequence of `(name, node)` pairs. Order is
//! insertion order and is what `readdir` projects; the name index only
//! speeds up lookups.

use core_types::NodeId;
use std::collections::HashMap;
use thiserror::Error;

use crate::DIRENT_HEADER_LEN;

/// Name of the back-reference entry every linked directory carries
pub const PARENT_ENTRY: &str = "..";

/// Longest name a directory record can describe
const MAX_RECORD_NAME: usize = u16::MAX as usize - DIRENT_HEADER_LEN;

/// Errors raised by entry list mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    /// An entry with this name already exists
    #[error("Entry already exists: {0}")]
    Duplicate(String),

    /// Name does not fit in a directory record
    #[error("Entry name too long: {0} bytes")]
    NameTooLong(usize),
}

/// A single entry in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Name of this entry
    pub name: String,
    /// Node the entry refers to
    pub node: NodeId,
}

impl DirectoryEntry {
    /// Creates a new directory entry
    pub fn new(name: impl Into<String>, node: NodeId) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }

    /// Whether this is the `..` back-reference
    pub fn is_parent(&self) -> bool {
        self.name == PARENT_ENTRY
    }
}

/// Ordered entries of one directory
///
/// Every mutation bumps `version`, which lets a resumed `readdir` notice
/// that the listing changed underneath it.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    entries: Vec<DirectoryEntry>,
    index: HashMap<String, NodeId>,
    version: u64,
}

impl EntryList {
    /// Creates an empty entry list
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry
    pub fn insert(&mut self, name: &str, node: NodeId) -> Result<(), EntryError> {
        if name.len() > MAX_RECORD_NAME {
            return Err(EntryError::NameTooLong(name.len()));
        }
        if self.index.contains_key(name) {
            return Err(EntryError::Duplicate(name.to_string()));
        }
        self.index.insert(name.to_string(), node);
        self.entries.push(DirectoryEntry::new(name, node));
        self.version += 1;
        Ok(())
    }

    /// Removes the entry with this name, keeping the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<DirectoryEntry> {
        self.index.remove(name)?;
        let position = self.entries.iter().position(|entry| entry.name == name)?;
        self.version += 1;
        Some(self.entries.remove(position))
    }

    /// Finds the node an entry name refers to
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Target of the `..` entry, if present
    pub fn parent(&self) -> Option<NodeId> {
        self.find(PARENT_ENTRY)
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }

    /// Number of entries, `..` included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether nothing but the `..` back-reference is present
    pub fn is_empty_but_parent(&self) -> bool {
        self.entries.iter().all(DirectoryEntry::is_parent)
    }

    /// Current mutation stamp
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<'a> IntoIterator for &'a EntryList {
    type Item = &'a DirectoryEntry;
    type IntoIter = std::slice::Iter<'a, DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut list = EntryList::new();
        list.insert("..", NodeId::ROOT).unwrap();
        list.insert("b", NodeId::new(2, 0)).unwrap();
        list.insert("a", NodeId::new(1, 0)).unwrap();

        let names: Vec<&str> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["..", "b", "a"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut list = EntryList::new();
        list.insert("file.txt", NodeId::new(1, 0)).unwrap();
        let result = list.insert("file.txt", NodeId::new(2, 0));
        assert_eq!(result, Err(EntryError::Duplicate("file.txt".to_string())));
        assert_eq!(list.find("file.txt"), Some(NodeId::new(1, 0)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_name_too_long_rejected() {
        let mut list = EntryList::new();
        let name = "x".repeat(MAX_RECORD_NAME + 1);
        assert_eq!(
            list.insert(&name, NodeId::new(1, 0)),
            Err(EntryError::NameTooLong(MAX_RECORD_NAME + 1))
        );
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut list = EntryList::new();
        list.insert("a", NodeId::new(1, 0)).unwrap();
        list.insert("b", NodeId::new(2, 0)).unwrap();
        list.insert("c", NodeId::new(3, 0)).unwrap();

        let removed = list.remove("b").unwrap();
        assert_eq!(removed.node, NodeId::new(2, 0));
        assert_eq!(list.find("b"), None);

        let names: Vec<&str> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_nonexistent_entry() {
        let mut list = EntryList::new();
        let before = list.version();
        assert!(list.remove("missing").is_none());
        assert_eq!(list.version(), before);
    }

    #[test]
    fn test_version_moves_on_mutation() {
        let mut list = EntryList::new();
        let v0 = list.version();
        list.insert("a", NodeId::new(1, 0)).unwrap();
        let v1 = list.version();
        list.remove("a");
        let v2 = list.version();
        assert!(v0 < v1 && v1 < v2);
    }

    #[test]
    fn test_empty_but_parent() {
        let mut list = EntryList::new();
        assert!(list.is_empty_but_parent());

        list.insert(PARENT_ENTRY, NodeId::ROOT).unwrap();
        assert!(list.is_empty_but_parent());
        assert_eq!(list.parent(), Some(NodeId::ROOT));

        list.insert("child", NodeId::new(4, 0)).unwrap();
        assert!(!list.is_empty_but_parent());
    }
}
