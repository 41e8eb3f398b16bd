//! Directory listing records
//!
//! `readdir` fills a caller buffer with back-to-back records:
//!
//! ```text
//! offset  size  field
//! 0       8     node id (NodeId::as_u64, little endian)
//! 8       8     offset of the next record in the logical stream
//! 16      2     record length (header + name)
//! 18      2     name length
//! 20      n     name bytes, not NUL terminated
//! ```
//!
//! The logical stream is every entry of the directory encoded in order.
//! A record's position in that stream is its cursor; a caller resumes a
//! listing by passing the `next_offset` of the last call.

use core_types::NodeId;
use thiserror::Error;

use crate::EntryList;

/// Size of the fixed part of a record
pub const DIRENT_HEADER_LEN: usize = 20;

/// Errors raised while decoding a record buffer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirentError {
    #[error("Truncated record at byte {0}")]
    Truncated(usize),

    #[error("Record at byte {offset} has inconsistent length {reclen}")]
    BadLength { offset: usize, reclen: usize },

    #[error("Record at byte {0} has a non UTF-8 name")]
    BadName(usize),
}

/// One decoded directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirentRecord {
    /// Node the entry refers to
    pub node: NodeId,
    /// Cursor of the following record
    pub next_offset: u64,
    /// Entry name
    pub name: String,
}

impl DirentRecord {
    /// Encoded length of a record carrying `name_len` name bytes
    pub fn record_len(name_len: usize) -> usize {
        DIRENT_HEADER_LEN + name_len
    }

    fn encode_into(node: NodeId, next_offset: u64, name: &str, buf: &mut Vec<u8>) {
        let reclen = Self::record_len(name.len());
        buf.extend_from_slice(&node.as_u64().to_le_bytes());
        buf.extend_from_slice(&next_offset.to_le_bytes());
        buf.extend_from_slice(&(reclen as u16).to_le_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
    }

    fn decode_at(buf: &[u8], at: usize) -> Result<(Self, usize), DirentError> {
        let header = buf
            .get(at..at + DIRENT_HEADER_LEN)
            .ok_or(DirentError::Truncated(at))?;
        let word = |range: std::ops::Range<usize>| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&header[range]);
            u64::from_le_bytes(bytes)
        };
        let half = |range: std::ops::Range<usize>| {
            let mut bytes = [0u8; 2];
            bytes.copy_from_slice(&header[range]);
            u16::from_le_bytes(bytes) as usize
        };

        let ino = word(0..8);
        let next_offset = word(8..16);
        let reclen = half(16..18);
        let namlen = half(18..20);
        if reclen != Self::record_len(namlen) {
            return Err(DirentError::BadLength { offset: at, reclen });
        }

        let name_start = at + DIRENT_HEADER_LEN;
        let name_bytes = buf
            .get(name_start..name_start + namlen)
            .ok_or(DirentError::Truncated(at))?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| DirentError::BadName(at))?
            .to_string();

        Ok((
            Self {
                node: NodeId::from_u64(ino),
                next_offset,
                name,
            },
            reclen,
        ))
    }
}

/// Decodes every record in a buffer filled by `readdir`
pub fn decode_records(buf: &[u8]) -> Result<Vec<DirentRecord>, DirentError> {
    let mut records = Vec::new();
    let mut at = 0;
    while at < buf.len() {
        let (record, reclen) = DirentRecord::decode_at(buf, at)?;
        records.push(record);
        at += reclen;
    }
    Ok(records)
}

/// Result of packing a window of the logical stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedEntries {
    /// Encoded records
    pub buf: Vec<u8>,
    /// Number of records in `buf`
    pub count: usize,
    /// Cursor to pass on the next call
    pub next_offset: u64,
    /// Whether the pass reached the last entry
    pub complete: bool,
}

/// Packs records starting at stream offset `offset` into at most
/// `capacity` bytes.
///
/// Packing stops after one full pass over the entries or before the first
/// record that would overflow `capacity`. An offset that falls inside a
/// record resumes at the next record boundary. When nothing is left the
/// returned `next_offset` equals the one passed in.
pub fn pack_entries(entries: &EntryList, offset: u64, capacity: usize) -> PackedEntries {
    let mut buf = Vec::new();
    let mut count = 0;
    let mut position = 0u64;

    for entry in entries {
        let reclen = DirentRecord::record_len(entry.name.len());
        if position >= offset {
            if buf.len() + reclen > capacity {
                return PackedEntries {
                    buf,
                    count,
                    next_offset: position,
                    complete: false,
                };
            }
            DirentRecord::encode_into(entry.node, position + reclen as u64, &entry.name, &mut buf);
            count += 1;
        }
        position += reclen as u64;
    }

    PackedEntries {
        buf,
        count,
        next_offset: position.max(offset),
        complete: true,
    }
}
