//! Namespace operations
//!
//! The control surface shared by the in-process service and its remote
//! client. Every call is one atomic step with respect to every other call.

use core_types::{NodeId, NodeKind};
use fs_view::{decode_records, DirentError, DirentRecord, PathResolver};
use serde::{Deserialize, Serialize};

use crate::FsError;

/// Attribute selector for [`FileSystemOperations::get_attr`] and
/// [`FileSystemOperations::set_attr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrField {
    Owner,
    Group,
    Mode,
    /// Content length; setting it grows or shrinks the file
    Size,
}

/// Resume point of a directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReaddirCursor {
    /// Byte offset into the logical record stream
    pub offset: u64,
    /// Directory version the offset was computed against
    ///
    /// `None` starts a fresh listing and skips the staleness check.
    pub version: Option<u64>,
}

impl ReaddirCursor {
    /// Cursor positioned at the first record
    pub fn start() -> Self {
        Self::default()
    }
}

/// One batch of directory records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadDir {
    /// Packed records, see [`fs_view::dirent`]
    pub buf: Vec<u8>,
    /// Number of records in `buf`
    pub count: usize,
    /// Cursor for the next call
    pub next: ReaddirCursor,
}

impl ReadDir {
    /// Decodes the packed records
    pub fn records(&self) -> Result<Vec<DirentRecord>, DirentError> {
        decode_records(&self.buf)
    }

    /// Whether the listing reached the end of the directory
    pub fn is_end(&self) -> bool {
        self.count == 0
    }
}

/// Operations of the namespace service
///
/// Remote implementations widen the error type to carry transport
/// failures next to operation errors.
pub trait FileSystemOperations {
    type Error: From<FsError>;

    /// Resolves `name` inside `dir`; `None` means the root
    fn lookup(&self, dir: Option<NodeId>, name: &str) -> Result<NodeId, Self::Error>;

    /// Reads one attribute
    fn get_attr(&self, id: NodeId, field: AttrField) -> Result<u64, Self::Error>;

    /// Writes one attribute
    fn set_attr(&self, id: NodeId, field: AttrField, value: u64) -> Result<(), Self::Error>;

    /// Adds the entry `name -> target` to `dir`
    ///
    /// A directory can be linked once only.
    fn link(&self, dir: NodeId, name: &str, target: NodeId) -> Result<(), Self::Error>;

    /// Removes `name` from `dir`, destroying the target once nothing names it
    ///
    /// Fails `Busy` when this would remove the last name of a node that an
    /// in-process holder still references (see [`crate::MemFs::hold`]).
    /// Nothing on the wire can hold a node, so remote callers never see it.
    fn unlink(&self, dir: NodeId, name: &str) -> Result<(), Self::Error>;

    /// Allocates an unlinked node
    fn create(&self, kind: NodeKind, mode: u32) -> Result<NodeId, Self::Error>;

    /// Unlinks a non-directory entry
    fn destroy(&self, dir: NodeId, name: &str) -> Result<(), Self::Error>;

    /// Creates and links a directory in one step
    fn mkdir(&self, dir: NodeId, name: &str, mode: u32) -> Result<NodeId, Self::Error>;

    /// Unlinks an empty directory
    fn rmdir(&self, dir: NodeId, name: &str) -> Result<(), Self::Error>;

    /// Packs directory records starting at `cursor` into at most
    /// `capacity` bytes
    fn readdir(
        &self,
        dir: NodeId,
        cursor: ReaddirCursor,
        capacity: usize,
    ) -> Result<ReadDir, Self::Error>;

    /// Device control hook
    fn ioctl(&self, id: NodeId, command: u32, arg: u64) -> Result<u64, Self::Error>;

    /// Reads up to `len` bytes of a file starting at `offset`
    fn read(&self, id: NodeId, offset: u64, len: usize) -> Result<Vec<u8>, Self::Error>;

    /// Writes `data` at `offset`, returning the number of bytes written
    fn write(&self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize, Self::Error>;

    /// Resolves an absolute path from the root
    ///
    /// The default walks the tree with one `lookup` per component, so a
    /// concurrent unlink can be observed halfway. Implementations that own
    /// the lock resolve the whole path in one step.
    fn resolve(&self, path: &str) -> Result<NodeId, Self::Error> {
        let components = PathResolver::split_path(path)
            .map_err(|err| FsError::InvalidArgument(err.to_string()))?;
        let mut current = self.lookup(None, fs_view::PARENT_ENTRY)?;
        for component in components {
            current = self.lookup(Some(current), component)?;
        }
        Ok(current)
    }
}
