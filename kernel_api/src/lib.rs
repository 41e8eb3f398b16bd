//! # Kernel API
//!
//! The interface between the namespace service and the microkernel.
//!
//! The kernel provides **mechanisms**, not policies:
//! - Channels and message passing
//! - Service registration and lookup
//! - A mount table mapping path prefixes to services
//!
//! The trait can be implemented by a simulated kernel for tests or by a
//! real syscall layer.

pub mod error;
pub mod kernel;

pub use error::KernelError;
pub use kernel::KernelApi;
