//! Namespace service errors

use fs_view::EntryError;
use node_store::{ContentError, TableError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by every namespace operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    /// Unknown node id, or name absent from a directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Wrong node kind or a missing/illegal parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Name already present in the directory
    #[error("Already exists: {0}")]
    Exists(String),

    /// Directory not empty, or node held elsewhere
    #[error("Busy: {0}")]
    Busy(String),

    /// Request is not implemented
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Directory changed since the readdir cursor was issued
    #[error("Stale cursor: {0}")]
    Stale(String),
}

impl FsError {
    /// Negative POSIX error number for clients that expect one
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => -2,
            FsError::InvalidArgument(_) => -22,
            FsError::Exists(_) => -17,
            FsError::Busy(_) => -16,
            FsError::Unsupported(_) => -95,
            FsError::Stale(_) => -116,
        }
    }

    pub fn kind(&self) -> FsErrorKind {
        match self {
            FsError::NotFound(_) => FsErrorKind::NotFound,
            FsError::InvalidArgument(_) => FsErrorKind::InvalidArgument,
            FsError::Exists(_) => FsErrorKind::Exists,
            FsError::Busy(_) => FsErrorKind::Busy,
            FsError::Unsupported(_) => FsErrorKind::Unsupported,
            FsError::Stale(_) => FsErrorKind::Stale,
        }
    }

    fn message(self) -> String {
        match self {
            FsError::NotFound(message)
            | FsError::InvalidArgument(message)
            | FsError::Exists(message)
            | FsError::Busy(message)
            | FsError::Unsupported(message)
            | FsError::Stale(message) => message,
        }
    }
}

impl From<TableError> for FsError {
    fn from(error: TableError) -> Self {
        match error {
            TableError::Exhausted { .. } => FsError::InvalidArgument(error.to_string()),
            TableError::Destroyed(_) => FsError::NotFound(error.to_string()),
            TableError::InUse { .. } | TableError::NotEmpty(_) => FsError::Busy(error.to_string()),
        }
    }
}

impl From<EntryError> for FsError {
    fn from(error: EntryError) -> Self {
        match error {
            EntryError::Duplicate(_) => FsError::Exists(error.to_string()),
            EntryError::NameTooLong(_) => FsError::InvalidArgument(error.to_string()),
        }
    }
}

impl From<ContentError> for FsError {
    fn from(error: ContentError) -> Self {
        FsError::InvalidArgument(error.to_string())
    }
}

/// Error kinds carried on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FsErrorKind {
    NotFound,
    InvalidArgument,
    Exists,
    Busy,
    Unsupported,
    Stale,
}

/// Serializable form of [`FsError`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FsWireError {
    pub kind: FsErrorKind,
    pub message: String,
}

impl From<FsError> for FsWireError {
    fn from(error: FsError) -> Self {
        Self {
            kind: error.kind(),
            message: error.message(),
        }
    }
}

impl From<FsWireError> for FsError {
    fn from(error: FsWireError) -> Self {
        match error.kind {
            FsErrorKind::NotFound => FsError::NotFound(error.message),
            FsErrorKind::InvalidArgument => FsError::InvalidArgument(error.message),
            FsErrorKind::Exists => FsError::Exists(error.message),
            FsErrorKind::Busy => FsError::Busy(error.message),
            FsErrorKind::Unsupported => FsError::Unsupported(error.message),
            FsErrorKind::Stale => FsError::Stale(error.message),
        }
    }
}
