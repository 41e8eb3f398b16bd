//! # Filesystem View
//!
//! Data structures behind a directory node of the namespace service.
//!
//! - [`EntryList`]: the ordered, name-indexed entries a directory owns
//! - [`DirentRecord`]: the fixed-layout record `readdir` packs into a
//!   caller buffer, and [`pack_entries`] which produces them
//! - [`PathResolver`]: path syntax helpers for callers above the
//!   directory layer

pub mod dirent;
pub mod directory;
pub mod path;

pub use directory::{DirectoryEntry, EntryError, EntryList, PARENT_ENTRY};
pub use dirent::{
    decode_records, pack_entries, DirentError, DirentRecord, PackedEntries, DIRENT_HEADER_LEN,
};
pub use path::{PathError, PathResolver};
