//! HTTP protocol layer
//!
//! Routes, request handlers and HTML responses. Everything here is a thin
//! consumer of the storage manager.

pub mod handlers;
pub mod responses;
pub mod routes;

pub use routes::routes;
