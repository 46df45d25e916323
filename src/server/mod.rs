//! Server core functionality
//!
//! Wires configuration, the storage manager and the HTTP router together.

pub mod core;

pub use core::Server;
