//! In-memory namespace service
//!
//! All state lives in one [`FsState`] behind a single spin lock. Every
//! public operation takes the lock exactly once and holds it for its whole
//! extent, so multi-step operations (check then create, lookup then
//! remove then destroy) are observed as one step. Operations that build on
//! others call the `FsState` methods directly instead of re-locking.

use core_types::{NodeId, NodeKind};
use fs_view::{pack_entries, PathResolver, PARENT_ENTRY};
use log::{debug, trace, warn};
use node_store::{ContentStore, MemoryContent, NodeGuard, NodeTable};
use spin::Mutex;

use crate::operations::{AttrField, FileSystemOperations, ReadDir, ReaddirCursor};
use crate::{FsError, MemFsConfig};

/// The namespace service
///
/// `MemFs` is `Sync`; share it behind an `Arc` to call it from several
/// threads.
pub struct MemFs {
    state: Mutex<FsState>,
}

struct FsState {
    nodes: NodeTable,
    content: Box<dyn ContentStore>,
    max_name_len: usize,
}

impl MemFs {
    /// Creates an empty service with heap-backed file contents
    ///
    /// The root does not exist until [`MemFs::init_root`] runs.
    pub fn new(config: &MemFsConfig) -> Self {
        Self::with_content(config, Box::new(MemoryContent::new(config.max_file_size)))
    }

    /// Creates an empty service over a custom content store
    pub fn with_content(config: &MemFsConfig, content: Box<dyn ContentStore>) -> Self {
        Self {
            state: Mutex::new(FsState {
                nodes: NodeTable::with_capacity(config.max_nodes),
                content,
                max_name_len: config.max_name_len,
            }),
        }
    }

    /// Allocates the root directory and gives it its `..` entry
    ///
    /// Root counts as linked once, by its mount point.
    pub fn init_root(&self, mode: u32) -> Result<NodeId, FsError> {
        let mut state = self.state.lock();
        let id = state.nodes.create(NodeKind::Directory, mode)?;
        let guard = state.acquire(id)?;
        let root = state.nodes.node_mut(&guard)?;
        root.add_link();
        if let Some(entries) = root.entries_mut() {
            entries.insert(PARENT_ENTRY, id)?;
        }
        debug!("root directory is {}", id);
        Ok(id)
    }

    /// Takes a reference to a node that outlives the call
    ///
    /// While the guard lives, unlinking the last name of the node fails
    /// with `Busy`.
    pub fn hold(&self, id: NodeId) -> Result<NodeGuard, FsError> {
        self.state.lock().acquire(id)
    }

    /// Number of live nodes, root included
    pub fn live_nodes(&self) -> usize {
        self.state.lock().nodes.live_count()
    }

    /// Outstanding references on a node, `None` once it is destroyed
    pub fn ref_count(&self, id: NodeId) -> Option<usize> {
        self.state.lock().nodes.ref_count(id)
    }

    /// Number of directory entries naming a node
    pub fn link_count(&self, id: NodeId) -> Result<u32, FsError> {
        let state = self.state.lock();
        let guard = state.acquire(id)?;
        Ok(state.nodes.node(&guard)?.links())
    }

    /// Kind of a live node
    pub fn kind(&self, id: NodeId) -> Result<NodeKind, FsError> {
        let state = self.state.lock();
        let guard = state.acquire(id)?;
        Ok(state.nodes.node(&guard)?.kind())
    }
}

impl FsState {
    fn acquire(&self, id: NodeId) -> Result<NodeGuard, FsError> {
        self.nodes
            .acquire(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))
    }

    fn acquire_dir(&self, id: NodeId) -> Result<NodeGuard, FsError> {
        let guard = self.acquire(id)?;
        if !self.nodes.node(&guard)?.is_dir() {
            return Err(FsError::InvalidArgument(format!("{} is not a directory", id)));
        }
        Ok(guard)
    }

    fn check_name(&self, name: &str) -> Result<(), FsError> {
        if !PathResolver::is_valid_name(name) {
            return Err(FsError::InvalidArgument(format!("illegal name {:?}", name)));
        }
        if name.len() > self.max_name_len {
            return Err(FsError::InvalidArgument(format!(
                "name longer than {} bytes",
                self.max_name_len
            )));
        }
        Ok(())
    }

    /// Whether `candidate` is `start` or one of its ancestors
    fn is_ancestor(&self, candidate: NodeId, start: NodeId) -> bool {
        let mut current = start;
        for _ in 0..=self.nodes.live_count() {
            if current == candidate {
                return true;
            }
            let parent = self.nodes.acquire(current).and_then(|guard| {
                self.nodes
                    .node(&guard)
                    .ok()
                    .and_then(|node| node.entries())
                    .and_then(|entries| entries.parent())
            });
            match parent {
                Some(parent) if parent != current => current = parent,
                _ => return false,
            }
        }
        false
    }

    fn lookup(&self, dir: NodeId, name: &str) -> Result<NodeId, FsError> {
        let guard = self.acquire_dir(dir)?;
        let found = self
            .nodes
            .node(&guard)?
            .entries()
            .and_then(|entries| entries.find(name));
        trace!("lookup {} in {} -> {:?}", name, dir, found);
        found.ok_or_else(|| FsError::NotFound(format!("{} in {}", name, dir)))
    }

    fn get_attr(&self, id: NodeId, field: AttrField) -> Result<u64, FsError> {
        let guard = self.acquire(id)?;
        let node = self.nodes.node(&guard)?;
        Ok(match field {
            AttrField::Owner => u64::from(node.owner),
            AttrField::Group => u64::from(node.group),
            AttrField::Mode => u64::from(node.mode),
            AttrField::Size => node.size,
        })
    }

    fn set_attr(&mut self, id: NodeId, field: AttrField, value: u64) -> Result<(), FsError> {
        let guard = self.acquire(id)?;
        let node = self.nodes.node_mut(&guard)?;
        match field {
            AttrField::Owner => node.owner = narrow(field, value)?,
            AttrField::Group => node.group = narrow(field, value)?,
            AttrField::Mode => node.mode = narrow(field, value)?,
            AttrField::Size => {
                if node.is_dir() {
                    return Err(FsError::InvalidArgument(format!(
                        "cannot resize directory {}",
                        id
                    )));
                }
                self.content.truncate(id, value)?;
                node.size = value;
            }
        }
        debug!("set {:?} of {} to {}", field, id, value);
        Ok(())
    }

    fn link(&mut self, dir: NodeId, name: &str, target: NodeId) -> Result<(), FsError> {
        self.check_name(name)?;
        if dir == target {
            return Err(FsError::InvalidArgument(format!(
                "cannot link {} into itself",
                dir
            )));
        }
        let dir_guard = self.acquire_dir(dir)?;
        let target_guard = self.acquire(target)?;

        let target_node = self.nodes.node(&target_guard)?;
        if target_node.is_dir() {
            if target_node.links() > 0 {
                return Err(FsError::InvalidArgument(format!(
                    "directory {} is already linked",
                    target
                )));
            }
            if self.is_ancestor(target, dir) {
                return Err(FsError::InvalidArgument(format!(
                    "{} is an ancestor of {}",
                    target, dir
                )));
            }
        }

        self.nodes
            .node_mut(&dir_guard)?
            .entries_mut()
            .ok_or_else(|| FsError::InvalidArgument(format!("{} is not a directory", dir)))?
            .insert(name, target)?;

        let target_node = self.nodes.node_mut(&target_guard)?;
        target_node.add_link();
        if let Some(entries) = target_node.entries_mut() {
            if entries.parent().is_none() {
                entries.insert(PARENT_ENTRY, dir)?;
            }
        }

        debug!("linked {} as {} in {}", target, name, dir);
        Ok(())
    }

    fn unlink(&mut self, dir: NodeId, name: &str) -> Result<(), FsError> {
        if name == PARENT_ENTRY {
            return Err(FsError::InvalidArgument("cannot unlink ..".to_string()));
        }
        let target = self.lookup(dir, name)?;
        let dir_guard = self.acquire_dir(dir)?;
        let target_guard = self.acquire(target)?;

        let target_node = self.nodes.node(&target_guard)?;
        if !target_node.is_empty_dir() {
            return Err(FsError::InvalidArgument(format!(
                "{} is a non-empty directory",
                name
            )));
        }
        if target_node.links() <= 1 {
            let held = self.nodes.ref_count(target).unwrap_or(0);
            if held > 1 {
                return Err(FsError::Busy(format!(
                    "{} has {} outstanding references",
                    name,
                    held - 1
                )));
            }
        }

        if let Some(entries) = self.nodes.node_mut(&dir_guard)?.entries_mut() {
            entries.remove(name);
        }
        drop(dir_guard);

        let target_node = self.nodes.node_mut(&target_guard)?;
        target_node.drop_link();
        if target_node.links() == 0 {
            let retired = self.nodes.destroy(target_guard)?;
            self.content.release(retired.id());
            debug!("unlinked {} from {}, destroyed {}", name, dir, retired.id());
        } else {
            debug!("unlinked {} from {}", name, dir);
        }
        Ok(())
    }

    fn create(&mut self, kind: NodeKind, mode: u32) -> Result<NodeId, FsError> {
        let id = self.nodes.create(kind, mode)?;
        debug!("created {} {} mode {:o}", kind, id, mode);
        Ok(id)
    }

    /// Retires a node nobody has linked yet
    fn discard(&mut self, id: NodeId) {
        if let Some(guard) = self.nodes.acquire(id) {
            if let Err(err) = self.nodes.destroy(guard) {
                warn!("failed to discard {}: {}", id, err);
            }
        }
    }

    fn destroy(&mut self, dir: NodeId, name: &str) -> Result<(), FsError> {
        if name == PARENT_ENTRY {
            return Err(FsError::InvalidArgument("cannot destroy ..".to_string()));
        }
        let target = self.lookup(dir, name)?;
        let guard = self.acquire(target)?;
        if self.nodes.node(&guard)?.is_dir() {
            return Err(FsError::InvalidArgument(format!(
                "{} is a directory, use rmdir",
                name
            )));
        }
        drop(guard);
        self.unlink(dir, name)
    }

    fn mkdir(&mut self, dir: NodeId, name: &str, mode: u32) -> Result<NodeId, FsError> {
        self.check_name(name)?;
        match self.lookup(dir, name) {
            Ok(_) => return Err(FsError::Exists(format!("{} in {}", name, dir))),
            Err(FsError::NotFound(_)) => {
                // The directory itself must resolve; only the name may be missing.
                self.acquire_dir(dir)?;
            }
            Err(err) => return Err(err),
        }

        let id = self.create(NodeKind::Directory, mode)?;
        if let Err(err) = self.link(dir, name, id) {
            self.discard(id);
            return Err(err);
        }
        Ok(id)
    }

    fn rmdir(&mut self, dir: NodeId, name: &str) -> Result<(), FsError> {
        if name == PARENT_ENTRY {
            return Err(FsError::InvalidArgument("cannot remove ..".to_string()));
        }
        let target = self.lookup(dir, name)?;
        let guard = self.acquire(target)?;
        let node = self.nodes.node(&guard)?;
        if !node.is_dir() {
            return Err(FsError::InvalidArgument(format!(
                "{} is not a directory",
                name
            )));
        }
        if !node.is_empty_dir() {
            return Err(FsError::Busy(format!("{} is not empty", name)));
        }
        drop(guard);
        self.unlink(dir, name)
    }

    fn readdir(
        &self,
        dir: NodeId,
        cursor: ReaddirCursor,
        capacity: usize,
    ) -> Result<ReadDir, FsError> {
        let guard = self.acquire_dir(dir)?;
        let entries = self
            .nodes
            .node(&guard)?
            .entries()
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| FsError::InvalidArgument(format!("{} has no entries", dir)))?;

        let version = entries.version();
        if let Some(expected) = cursor.version {
            if expected != version {
                return Err(FsError::Stale(format!(
                    "{} changed since version {}",
                    dir, expected
                )));
            }
        }

        let packed = pack_entries(entries, cursor.offset, capacity);
        if packed.count == 0 && !packed.complete {
            return Err(FsError::InvalidArgument(format!(
                "{} bytes cannot hold the next record",
                capacity
            )));
        }

        trace!(
            "readdir {} at {} -> {} records",
            dir,
            cursor.offset,
            packed.count
        );
        Ok(ReadDir {
            buf: packed.buf,
            count: packed.count,
            next: ReaddirCursor {
                offset: packed.next_offset,
                version: Some(version),
            },
        })
    }

    fn read(&self, id: NodeId, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let guard = self.acquire(id)?;
        let node = self.nodes.node(&guard)?;
        if node.is_dir() {
            return Err(FsError::InvalidArgument(format!("{} is a directory", id)));
        }
        let available = node.size.saturating_sub(offset);
        let len = len.min(usize::try_from(available).unwrap_or(usize::MAX));
        let mut buf = vec![0; len];
        let count = self.content.read(id, offset, &mut buf);
        buf.truncate(count);
        Ok(buf)
    }

    fn write(&mut self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        let guard = self.acquire(id)?;
        let node = self.nodes.node_mut(&guard)?;
        if node.is_dir() {
            return Err(FsError::InvalidArgument(format!("{} is a directory", id)));
        }
        node.size = self.content.write(id, offset, data)?;
        trace!("wrote {} bytes to {} at {}", data.len(), id, offset);
        Ok(data.len())
    }

    fn resolve(&self, path: &str) -> Result<NodeId, FsError> {
        let components = PathResolver::split_path(path)
            .map_err(|err| FsError::InvalidArgument(err.to_string()))?;
        let mut current = NodeId::ROOT;
        self.acquire_dir(current)?;
        for component in components {
            current = self.lookup(current, component)?;
        }
        Ok(current)
    }
}

fn narrow(field: AttrField, value: u64) -> Result<u32, FsError> {
    u32::try_from(value)
        .map_err(|_| FsError::InvalidArgument(format!("{:?} value {} out of range", field, value)))
}

impl FileSystemOperations for MemFs {
    type Error = FsError;

    fn lookup(&self, dir: Option<NodeId>, name: &str) -> Result<NodeId, FsError> {
        self.state.lock().lookup(dir.unwrap_or(NodeId::ROOT), name)
    }

    fn get_attr(&self, id: NodeId, field: AttrField) -> Result<u64, FsError> {
        self.state.lock().get_attr(id, field)
    }

    fn set_attr(&self, id: NodeId, field: AttrField, value: u64) -> Result<(), FsError> {
        self.state.lock().set_attr(id, field, value)
    }

    fn link(&self, dir: NodeId, name: &str, target: NodeId) -> Result<(), FsError> {
        self.state.lock().link(dir, name, target)
    }

    fn unlink(&self, dir: NodeId, name: &str) -> Result<(), FsError> {
        self.state.lock().unlink(dir, name)
    }

    fn create(&self, kind: NodeKind, mode: u32) -> Result<NodeId, FsError> {
        self.state.lock().create(kind, mode)
    }

    fn destroy(&self, dir: NodeId, name: &str) -> Result<(), FsError> {
        self.state.lock().destroy(dir, name)
    }

    fn mkdir(&self, dir: NodeId, name: &str, mode: u32) -> Result<NodeId, FsError> {
        self.state.lock().mkdir(dir, name, mode)
    }

    fn rmdir(&self, dir: NodeId, name: &str) -> Result<(), FsError> {
        self.state.lock().rmdir(dir, name)
    }

    fn readdir(
        &self,
        dir: NodeId,
        cursor: ReaddirCursor,
        capacity: usize,
    ) -> Result<ReadDir, FsError> {
        self.state.lock().readdir(dir, cursor, capacity)
    }

    fn ioctl(&self, id: NodeId, command: u32, _arg: u64) -> Result<u64, FsError> {
        Err(FsError::Unsupported(format!(
            "ioctl {:#x} on {}",
            command, id
        )))
    }

    fn read(&self, id: NodeId, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        self.state.lock().read(id, offset, len)
    }

    fn write(&self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        self.state.lock().write(id, offset, data)
    }

    fn resolve(&self, path: &str) -> Result<NodeId, FsError> {
        self.state.lock().resolve(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> MemFs {
        fs_with(MemFsConfig::default())
    }

    fn fs_with(config: MemFsConfig) -> MemFs {
        let fs = MemFs::new(&config);
        assert_eq!(fs.init_root(0o755).unwrap(), NodeId::ROOT);
        fs
    }

    fn names(fs: &MemFs, dir: NodeId) -> Vec<String> {
        let listing = fs.readdir(dir, ReaddirCursor::start(), 4096).unwrap();
        listing
            .records()
            .unwrap()
            .into_iter()
            .map(|record| record.name)
            .collect()
    }

    #[test]
    fn test_root_parent_is_itself() {
        let fs = fs();
        assert_eq!(fs.lookup(None, "..").unwrap(), NodeId::ROOT);
        assert_eq!(fs.kind(NodeId::ROOT).unwrap(), NodeKind::Directory);
        assert_eq!(fs.get_attr(NodeId::ROOT, AttrField::Mode).unwrap(), 0o755);
    }

    #[test]
    fn test_lookup_requires_directory() {
        let fs = fs();
        let file = fs.create(NodeKind::File, 0).unwrap();
        assert!(matches!(
            fs.lookup(Some(file), "x"),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.lookup(Some(NodeId::new(77, 0)), "x"),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(fs.lookup(None, "absent"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_mkdir_lookup_rmdir_cycle() {
        let fs = fs();
        let a = fs.mkdir(NodeId::ROOT, "a", 0).unwrap();
        assert_eq!(fs.lookup(None, "a").unwrap(), a);
        assert!(matches!(
            fs.mkdir(NodeId::ROOT, "a", 0),
            Err(FsError::Exists(_))
        ));

        fs.rmdir(NodeId::ROOT, "a").unwrap();
        assert!(matches!(fs.lookup(None, "a"), Err(FsError::NotFound(_))));
        assert_eq!(fs.ref_count(a), None);
        assert_eq!(fs.live_nodes(), 1);
    }

    #[test]
    fn test_new_directory_points_back_to_parent() {
        let fs = fs();
        let a = fs.mkdir(NodeId::ROOT, "a", 0).unwrap();
        let b = fs.mkdir(a, "b", 0).unwrap();
        assert_eq!(fs.lookup(Some(b), "..").unwrap(), a);
        assert_eq!(fs.lookup(Some(a), "..").unwrap(), NodeId::ROOT);
        assert_eq!(names(&fs, a), vec!["..", "b"]);
    }

    #[test]
    fn test_rmdir_refuses_populated_directory() {
        let fs = fs();
        let a = fs.mkdir(NodeId::ROOT, "a", 0).unwrap();
        fs.mkdir(a, "b", 0).unwrap();

        assert!(matches!(fs.rmdir(NodeId::ROOT, "a"), Err(FsError::Busy(_))));
        fs.rmdir(a, "b").unwrap();
        fs.rmdir(NodeId::ROOT, "a").unwrap();
    }

    #[test]
    fn test_rmdir_and_destroy_check_kind() {
        let fs = fs();
        let file = fs.create(NodeKind::File, 0).unwrap();
        fs.link(NodeId::ROOT, "f", file).unwrap();
        fs.mkdir(NodeId::ROOT, "d", 0).unwrap();

        assert!(matches!(
            fs.rmdir(NodeId::ROOT, "f"),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.destroy(NodeId::ROOT, "d"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_link_then_destroy_retires_file() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.link(NodeId::ROOT, "f.txt", f).unwrap();
        assert_eq!(fs.lookup(None, "f.txt").unwrap(), f);

        fs.destroy(NodeId::ROOT, "f.txt").unwrap();
        assert!(matches!(
            fs.get_attr(f, AttrField::Size),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_survives_until_last_name_goes() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.link(NodeId::ROOT, "one", f).unwrap();
        fs.link(NodeId::ROOT, "two", f).unwrap();
        assert_eq!(fs.link_count(f).unwrap(), 2);

        fs.unlink(NodeId::ROOT, "one").unwrap();
        assert_eq!(fs.lookup(None, "two").unwrap(), f);
        fs.unlink(NodeId::ROOT, "two").unwrap();
        assert_eq!(fs.ref_count(f), None);
    }

    #[test]
    fn test_directory_cannot_be_linked_twice() {
        let fs = fs();
        let d = fs.mkdir(NodeId::ROOT, "d", 0).unwrap();
        assert!(matches!(
            fs.link(NodeId::ROOT, "alias", d),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.link(d, "root", NodeId::ROOT),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unlinked_directory_cannot_adopt_its_parent() {
        let fs = fs();
        let outer = fs.create(NodeKind::Directory, 0).unwrap();
        let inner = fs.create(NodeKind::Directory, 0).unwrap();
        fs.link(outer, "inner", inner).unwrap();

        assert!(matches!(
            fs.link(inner, "loop", outer),
            Err(FsError::InvalidArgument(_))
        ));
        fs.link(NodeId::ROOT, "outer", outer).unwrap();
        assert_eq!(fs.resolve("/outer/inner").unwrap(), inner);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        let g = fs.create(NodeKind::File, 0).unwrap();
        fs.link(NodeId::ROOT, "name", f).unwrap();
        assert!(matches!(
            fs.link(NodeId::ROOT, "name", g),
            Err(FsError::Exists(_))
        ));
        assert_eq!(fs.link_count(g).unwrap(), 0);
    }

    #[test]
    fn test_illegal_names_rejected() {
        let fs = fs_with(MemFsConfig::default().with_max_name_len(8));
        for name in ["", ".", "..", "a/b", "nul\0", "much-too-long"] {
            assert!(
                matches!(
                    fs.mkdir(NodeId::ROOT, name, 0),
                    Err(FsError::InvalidArgument(_))
                ),
                "accepted {:?}",
                name
            );
        }
        assert!(matches!(
            fs.unlink(NodeId::ROOT, ".."),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.rmdir(NodeId::ROOT, ".."),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unlink_busy_while_held() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.link(NodeId::ROOT, "held", f).unwrap();

        let guard = fs.hold(f).unwrap();
        assert!(matches!(
            fs.unlink(NodeId::ROOT, "held"),
            Err(FsError::Busy(_))
        ));
        assert_eq!(fs.lookup(None, "held").unwrap(), f);

        drop(guard);
        fs.unlink(NodeId::ROOT, "held").unwrap();
        assert_eq!(fs.ref_count(f), None);
    }

    #[test]
    fn test_unlink_of_populated_directory_rejected() {
        let fs = fs();
        let d = fs.mkdir(NodeId::ROOT, "d", 0).unwrap();
        fs.mkdir(d, "e", 0).unwrap();
        assert!(matches!(
            fs.unlink(NodeId::ROOT, "d"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_create_fails_when_table_full() {
        let fs = fs_with(MemFsConfig::default().with_max_nodes(2));
        fs.create(NodeKind::File, 0).unwrap();
        assert!(matches!(
            fs.create(NodeKind::File, 0),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.mkdir(NodeId::ROOT, "x", 0),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(fs.lookup(None, "x"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_stale_id_after_slot_reuse() {
        let fs = fs();
        let old = fs.mkdir(NodeId::ROOT, "old", 0).unwrap();
        fs.rmdir(NodeId::ROOT, "old").unwrap();
        let new = fs.mkdir(NodeId::ROOT, "new", 0).unwrap();

        assert_eq!(new.index(), old.index());
        assert!(matches!(
            fs.get_attr(old, AttrField::Mode),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_attributes() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0o600).unwrap();
        fs.set_attr(f, AttrField::Owner, 1000).unwrap();
        fs.set_attr(f, AttrField::Group, 100).unwrap();
        fs.set_attr(f, AttrField::Mode, 0o644).unwrap();

        assert_eq!(fs.get_attr(f, AttrField::Owner).unwrap(), 1000);
        assert_eq!(fs.get_attr(f, AttrField::Group).unwrap(), 100);
        assert_eq!(fs.get_attr(f, AttrField::Mode).unwrap(), 0o644);
        assert!(matches!(
            fs.set_attr(f, AttrField::Owner, u64::MAX),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_size_resizes_content() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.write(f, 0, b"abcdef").unwrap();

        fs.set_attr(f, AttrField::Size, 3).unwrap();
        assert_eq!(fs.get_attr(f, AttrField::Size).unwrap(), 3);
        assert_eq!(fs.read(f, 0, 16).unwrap(), b"abc");

        fs.set_attr(f, AttrField::Size, 5).unwrap();
        assert_eq!(fs.read(f, 0, 16).unwrap(), b"abc\0\0");
        assert!(matches!(
            fs.set_attr(NodeId::ROOT, AttrField::Size, 0),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_write_leaves_size_alone() {
        let fs = fs();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.write(f, 0, b"abc").unwrap();

        assert_eq!(fs.write(f, 4096, b"").unwrap(), 0);
        assert_eq!(fs.get_attr(f, AttrField::Size).unwrap(), 3);
        assert_eq!(fs.read(f, 0, 16).unwrap(), b"abc");
    }

    #[test]
    fn test_write_respects_size_limit() {
        let fs = fs_with(MemFsConfig::default().with_max_file_size(4));
        let f = fs.create(NodeKind::File, 0).unwrap();
        assert!(matches!(
            fs.write(f, 2, b"xyz"),
            Err(FsError::InvalidArgument(_))
        ));
        assert_eq!(fs.get_attr(f, AttrField::Size).unwrap(), 0);
    }

    #[test]
    fn test_data_plane_rejects_directories() {
        let fs = fs();
        assert!(matches!(
            fs.read(NodeId::ROOT, 0, 8),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.write(NodeId::ROOT, 0, b"x"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_readdir_resumes_without_gaps() {
        let fs = fs();
        let expected: Vec<String> = (0..6).map(|i| format!("entry{}", i)).collect();
        for name in &expected {
            fs.mkdir(NodeId::ROOT, name, 0).unwrap();
        }

        let mut cursor = ReaddirCursor::start();
        let mut seen = Vec::new();
        loop {
            let batch = fs.readdir(NodeId::ROOT, cursor, 64).unwrap();
            if batch.is_end() {
                break;
            }
            seen.extend(batch.records().unwrap().into_iter().map(|r| r.name));
            cursor = batch.next;
        }

        assert_eq!(seen[0], "..");
        assert_eq!(&seen[1..], expected.as_slice());
    }

    #[test]
    fn test_readdir_detects_concurrent_change() {
        let fs = fs();
        fs.mkdir(NodeId::ROOT, "a", 0).unwrap();
        fs.mkdir(NodeId::ROOT, "b", 0).unwrap();

        let first = fs.readdir(NodeId::ROOT, ReaddirCursor::start(), 24).unwrap();
        assert_eq!(first.count, 1);

        fs.mkdir(NodeId::ROOT, "c", 0).unwrap();
        assert!(matches!(
            fs.readdir(NodeId::ROOT, first.next, 4096),
            Err(FsError::Stale(_))
        ));
        assert!(fs.readdir(NodeId::ROOT, ReaddirCursor::start(), 4096).is_ok());
    }

    #[test]
    fn test_readdir_buffer_too_small() {
        let fs = fs();
        assert!(matches!(
            fs.readdir(NodeId::ROOT, ReaddirCursor::start(), 8),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_readdir_of_file_or_unlinked_directory() {
        let fs = fs();
        let file = fs.create(NodeKind::File, 0).unwrap();
        let dir = fs.create(NodeKind::Directory, 0).unwrap();
        assert!(matches!(
            fs.readdir(file, ReaddirCursor::start(), 4096),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.readdir(dir, ReaddirCursor::start(), 4096),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_resolve_paths() {
        let fs = fs();
        let etc = fs.mkdir(NodeId::ROOT, "etc", 0).unwrap();
        let conf = fs.create(NodeKind::File, 0).unwrap();
        fs.link(etc, "fs.conf", conf).unwrap();

        assert_eq!(fs.resolve("/").unwrap(), NodeId::ROOT);
        assert_eq!(fs.resolve("/etc/fs.conf").unwrap(), conf);
        assert_eq!(fs.resolve("/etc/..").unwrap(), NodeId::ROOT);
        assert!(matches!(fs.resolve("/etc/missing"), Err(FsError::NotFound(_))));
        assert!(matches!(
            fs.resolve("/etc//fs.conf"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ioctl_is_unsupported() {
        let fs = fs();
        assert!(matches!(
            fs.ioctl(NodeId::ROOT, 0x5401, 0),
            Err(FsError::Unsupported(_))
        ));
    }

    #[test]
    fn test_operations_release_their_references() {
        let fs = fs();
        let d = fs.mkdir(NodeId::ROOT, "d", 0).unwrap();
        let f = fs.create(NodeKind::File, 0).unwrap();
        fs.link(d, "f", f).unwrap();
        fs.write(f, 0, b"data").unwrap();
        fs.readdir(d, ReaddirCursor::start(), 4096).unwrap();
        let _ = fs.lookup(Some(d), "missing");

        assert_eq!(fs.ref_count(NodeId::ROOT), Some(0));
        assert_eq!(fs.ref_count(d), Some(0));
        assert_eq!(fs.ref_count(f), Some(0));
    }
}
