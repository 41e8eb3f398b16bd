//! Node records

use core_types::{NodeId, NodeKind};
use fs_view::EntryList;

/// A file or directory
///
/// `links` counts the directory entries naming this node, `..`
/// back-references excluded. It is the structural reachability of the
/// node and is unrelated to the live reference count the table keeps.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    /// Permission bits (stored, never enforced)
    pub mode: u32,
    /// Owning user
    pub owner: u32,
    /// Owning group
    pub group: u32,
    /// Content length in bytes
    pub size: u64,
    links: u32,
    entries: Option<EntryList>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, mode: u32) -> Self {
        let entries = match kind {
            NodeKind::Directory => Some(EntryList::new()),
            NodeKind::File => None,
        };
        Self {
            id,
            kind,
            mode,
            owner: 0,
            group: 0,
            size: 0,
            links: 0,
            entries,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Number of entries naming this node
    pub fn links(&self) -> u32 {
        self.links
    }

    pub fn add_link(&mut self) {
        self.links += 1;
    }

    pub fn drop_link(&mut self) {
        self.links = self.links.saturating_sub(1);
    }

    /// Entry list; `None` for files
    pub fn entries(&self) -> Option<&EntryList> {
        self.entries.as_ref()
    }

    pub fn entries_mut(&mut self) -> Option<&mut EntryList> {
        self.entries.as_mut()
    }

    /// Whether the node holds no entries beyond `..`
    ///
    /// Files are always empty.
    pub fn is_empty_dir(&self) -> bool {
        self.entries
            .as_ref()
            .map_or(true, EntryList::is_empty_but_parent)
    }
}
