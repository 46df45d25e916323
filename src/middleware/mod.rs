//! Server middleware
//!
//! Provides request logging middleware.

pub mod logging;
