//! Arithmetic tools served over HTTP routes and the Model Context Protocol.
//!
//! The tool registry in [`crate::core::registry`] is the center of the crate. The
//! transports in [`crate::core::server`] and the dispatcher in [`crate::core::protocol`]
//! only read from it once it is built.

pub mod core;
pub mod tools;
