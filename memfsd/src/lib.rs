//! # memfsd
//!
//! Host daemon for the memory filesystem service.
//!
//! ## Responsibilities
//!
//! The daemon:
//! - Loads the service configuration
//! - Boots the service on a simulated kernel
//! - Runs a command script against it through a protocol client
//! - Reports each command's output or error
//!
//! It never touches the operation layer directly; everything goes through
//! request messages.

pub mod commands;
pub mod config;
pub mod logger;
pub mod runtime;

pub use commands::{CommandError, FsCommand, FsCommandParser};
pub use config::{load_config_file, ConfigFileError};
pub use runtime::{DaemonConfig, DaemonError, MemfsDaemon, ScriptError};
